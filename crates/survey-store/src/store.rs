//! Transactional entity store
//!
//! Readers take the read lock and see a consistent `Tables`. A transaction
//! takes the write lock, runs against a structural-sharing copy and swaps it
//! in only if the closure succeeds; an error discards every change.
//!
//! The journal lock pairs a mutation with its audit event: mutations hold it
//! shared for the write and the append, a snapshot holds it exclusively, so a
//! snapshot never contains a change without the event that records it.

use crate::audit::{verify_chain, AuditEvent, AuditLog};
use crate::invariants::Violation;
use crate::tables::Tables;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use survey_core::{SurveyError, SurveyResult};
use tracing::{debug, info};

/// On-disk format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized store state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub tables: Tables,
    #[serde(default)]
    pub audit: Vec<AuditEvent>,
}

impl Snapshot {
    /// Parse and check a snapshot file.
    pub fn read_from(path: &Path) -> SurveyResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| SurveyError::Storage(format!("{}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|e| SurveyError::Storage(format!("{}: {e}", path.display())))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SurveyError::Storage(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Every inconsistency in the tables and the audit chain
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .tables
            .check_invariants()
            .iter()
            .map(Violation::to_string)
            .collect();
        if let Err(broken) = verify_chain(&self.audit) {
            problems.push(broken.to_string());
        }
        problems
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    journal: RwLock<()>,
    tables: RwLock<Tables>,
    audit: AuditLog,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a consistent view.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.read())
    }

    /// Run `f` as one atomic unit. Writers are serialized.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Tables) -> SurveyResult<R>) -> SurveyResult<R> {
        let mut guard = self.tables.write();
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }

    /// Run `f` (a transaction plus its audit append) under the shared journal
    /// lock. Must not be nested.
    pub fn journaled<R>(&self, f: impl FnOnce() -> R) -> R {
        let _journal = self.journal.read();
        f()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Point-in-time copy of every table
    #[must_use]
    pub fn tables(&self) -> Tables {
        self.tables.read().clone()
    }

    /// Tables and audit chain captured together, with no journaled write in flight
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let _journal = self.journal.write();
        let tables = self.tables.read();
        Snapshot {
            version: SNAPSHOT_VERSION,
            tables: tables.clone(),
            audit: self.audit.events(),
        }
    }

    /// Write a JSON snapshot, replacing `path` atomically.
    pub fn save_snapshot(&self, path: &Path) -> SurveyResult<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| SurveyError::Storage(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| SurveyError::Storage(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), events = snapshot.audit.len(), "snapshot written");
        Ok(())
    }

    /// Rebuild a store from a snapshot, refusing inconsistent data.
    pub fn load_snapshot(path: &Path) -> SurveyResult<Self> {
        let snapshot = Snapshot::read_from(path)?;
        let problems = snapshot.problems();
        if let Some(first) = problems.first() {
            return Err(SurveyError::Storage(format!(
                "{} problem(s) in snapshot, first: {first}",
                problems.len()
            )));
        }
        let audit = AuditLog::new();
        audit.restore(snapshot.audit);
        info!(path = %path.display(), counts = ?snapshot.tables.counts(), "snapshot loaded");
        Ok(Self {
            journal: RwLock::new(()),
            tables: RwLock::new(snapshot.tables),
            audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Outcome;
    use chrono::Utc;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let store = EntityStore::new();
        let result: SurveyResult<()> = store.transaction(|t| {
            t.insert_user("a@x.org".into(), None, "h".into())?;
            Err(SurveyError::payload("abort"))
        });
        assert!(result.is_err());
        assert_eq!(store.read(|t| t.counts().users), 0);

        // sequence numbers roll back too
        let user = store
            .transaction(|t| t.insert_user("a@x.org".into(), None, "h".into()))
            .unwrap();
        assert_eq!(user.id.get(), 1);
    }

    #[test]
    fn snapshot_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = EntityStore::new();
        store
            .transaction(|t| t.insert_user("a@x.org".into(), Some("A".into()), "h".into()))
            .unwrap();
        store.audit().record(Utc::now(), "user:1", "user.register", "user:1", Outcome::Ok);
        store.save_snapshot(&path).unwrap();

        let loaded = EntityStore::load_snapshot(&path).unwrap();
        assert_eq!(loaded.tables(), store.tables());
        assert_eq!(loaded.audit().len(), 1);
        assert!(loaded.audit().verify_integrity().is_ok());
    }

    #[test]
    fn snapshot_waits_for_journaled_writes() {
        use std::sync::{mpsc, Arc};
        use std::thread;
        use std::time::Duration;

        let store = Arc::new(EntityStore::new());
        let (committed, wait_commit) = mpsc::channel();
        let (release, wait_release) = mpsc::channel::<()>();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.journaled(|| {
                    let user = store
                        .transaction(|t| t.insert_user("a@x.org".into(), None, "h".into()))
                        .unwrap();
                    committed.send(()).unwrap();
                    wait_release.recv().unwrap();
                    store
                        .audit()
                        .record(Utc::now(), "anonymous", "user.register", user.id, Outcome::Ok);
                });
            })
        };

        wait_commit.recv().unwrap();
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.snapshot())
        };
        thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
        writer.join().unwrap();

        let snapshot = reader.join().unwrap();
        assert_eq!(snapshot.tables.counts().users, 1);
        assert_eq!(snapshot.audit.len(), 1);
        assert!(snapshot.problems().is_empty());
    }

    #[test]
    fn missing_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EntityStore::load_snapshot(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SurveyError::Storage(_)));
        assert!(!err.is_client_error());
    }
}

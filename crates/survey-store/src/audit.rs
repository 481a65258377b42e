//! Append-only audit trail
//!
//! Every mutating operation appends one event. Each event carries the hash
//! of its predecessor, so editing or dropping an entry breaks the chain and
//! `verify_integrity` reports where.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Result of the audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Rejected,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub principal: String,
    pub action: String,
    pub target: String,
    pub outcome: Outcome,
    #[serde(with = "hex_hash")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex_hash")]
    pub hash: [u8; 32],
}

/// First event whose links do not check out
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("audit chain broken at event {seq}")]
pub struct IntegrityViolation {
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEvent>>,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number.
    pub fn record(
        &self,
        timestamp: DateTime<Utc>,
        principal: impl fmt::Display,
        action: &str,
        target: impl fmt::Display,
        outcome: Outcome,
    ) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        let seq = guard.last().map_or(0, |e| e.seq + 1);
        let mut event = AuditEvent {
            seq,
            timestamp,
            principal: principal.to_string(),
            action: action.to_string(),
            target: target.to_string(),
            outcome,
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = compute_hash(&event);
        guard.push(event);
        seq
    }

    /// Replace the chain with previously exported events.
    pub fn restore(&self, events: Vec<AuditEvent>) {
        *self.inner.lock() = events;
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn verify_integrity(&self) -> Result<(), IntegrityViolation> {
        verify_chain(&self.inner.lock())
    }

    /// Head hash, hex encoded
    pub fn head(&self) -> Option<String> {
        self.inner.lock().last().map(|e| hex::encode(e.hash))
    }
}

/// Check links and hashes of an exported chain.
pub fn verify_chain(events: &[AuditEvent]) -> Result<(), IntegrityViolation> {
    let mut prev = [0u8; 32];
    for e in events {
        if e.prev_hash != prev || e.hash != compute_hash(e) {
            return Err(IntegrityViolation { seq: e.seq });
        }
        prev = e.hash;
    }
    Ok(())
}

fn compute_hash(event: &AuditEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.seq.to_le_bytes());
    hasher.update(event.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(event.principal.as_bytes());
    hasher.update([0]);
    hasher.update(event.action.as_bytes());
    hasher.update([0]);
    hasher.update(event.target.as_bytes());
    hasher.update([0]);
    hasher.update(event.outcome.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

mod hex_hash {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(d)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(raw, &mut out).map_err(D::Error::custom)?;
        Ok(out)
    }
}

//! Referential and ownership consistency checks
//!
//! Run after loading a snapshot and by `survey-admin verify`. A clean store
//! reports no violations.

use crate::tables::Tables;
use std::fmt;

/// One broken rule found in the tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Child row points at a missing parent
    DanglingParent { entity: &'static str, id: u64 },
    /// Child `owner_id` differs from its parent's
    OwnerMismatch { entity: &'static str, id: u64 },
    /// Answer refers to a missing alternative, research or subject
    DanglingAnswer { id: u64 },
    /// Membership refers to a missing subject or research
    DanglingEnrollment { subject: u64, research: u64 },
    /// Closed research whose end does not follow its start
    Timeline { research: u64 },
    /// Two accounts share a username
    DuplicateUsername { username: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingParent { entity, id } => write!(f, "{entity} {id} has no parent"),
            Self::OwnerMismatch { entity, id } => {
                write!(f, "{entity} {id} owner differs from its parent")
            }
            Self::DanglingAnswer { id } => write!(f, "answer {id} has a dangling reference"),
            Self::DanglingEnrollment { subject, research } => {
                write!(f, "enrollment ({subject}, {research}) has a dangling reference")
            }
            Self::Timeline { research } => {
                write!(f, "research {research} ends before it starts")
            }
            Self::DuplicateUsername { username } => write!(f, "username {username} is not unique"),
        }
    }
}

impl Tables {
    #[must_use]
    pub fn check_invariants(&self) -> Vec<Violation> {
        let mut found = Vec::new();

        for r in self.researches.values() {
            if !self.users.contains_key(&r.owner_id) {
                found.push(Violation::DanglingParent { entity: "research", id: r.id.get() });
            }
            if let (Some(start), Some(end)) = (r.start_time, r.end_time) {
                if end <= start {
                    found.push(Violation::Timeline { research: r.id.get() });
                }
            }
        }

        for q in self.questionnaires.values() {
            match self.researches.get(&q.research_id) {
                None => found.push(Violation::DanglingParent { entity: "questionnaire", id: q.id.get() }),
                Some(p) if p.owner_id != q.owner_id => {
                    found.push(Violation::OwnerMismatch { entity: "questionnaire", id: q.id.get() });
                }
                Some(_) => {}
            }
        }

        for q in self.questions.values() {
            match self.questionnaires.get(&q.questionnaire_id) {
                None => found.push(Violation::DanglingParent { entity: "question", id: q.id.get() }),
                Some(p) if p.owner_id != q.owner_id => {
                    found.push(Violation::OwnerMismatch { entity: "question", id: q.id.get() });
                }
                Some(_) => {}
            }
        }

        for a in self.alternatives.values() {
            match self.questions.get(&a.question_id) {
                None => found.push(Violation::DanglingParent { entity: "alternative", id: a.id.get() }),
                Some(p) if p.owner_id != a.owner_id => {
                    found.push(Violation::OwnerMismatch { entity: "alternative", id: a.id.get() });
                }
                Some(_) => {}
            }
        }

        for a in self.answers.values() {
            if !self.alternatives.contains_key(&a.alternative_id)
                || !self.researches.contains_key(&a.research_id)
                || !self.subjects.contains_key(&a.subject_id)
            {
                found.push(Violation::DanglingAnswer { id: a.id.get() });
            }
        }

        for e in &self.enrollments {
            if !self.subjects.contains_key(&e.subject_id) || !self.researches.contains_key(&e.research_id) {
                found.push(Violation::DanglingEnrollment {
                    subject: e.subject_id.get(),
                    research: e.research_id.get(),
                });
            }
        }

        // Researchers and subjects are separate account spaces.
        duplicates(self.users.values().map(|u| u.username.as_str()), &mut found);
        duplicates(self.subjects.values().map(|s| s.username.as_str()), &mut found);

        found
    }
}

fn duplicates<'a>(usernames: impl Iterator<Item = &'a str>, found: &mut Vec<Violation>) {
    let mut seen = std::collections::BTreeSet::new();
    for username in usernames {
        if !seen.insert(username) {
            found.push(Violation::DuplicateUsername { username: username.to_string() });
        }
    }
}

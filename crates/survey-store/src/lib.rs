//! Survey Store - in-memory transactional storage for the survey backend
//!
//! Tables are persistent maps behind a single read/write lock. All writes go
//! through [`EntityStore::transaction`], which commits only on success. Scoped
//! lookups ([`guard`]) double as the authorization check: a row is returned
//! only when its whole ownership chain matches.

#![allow(missing_docs)]

pub mod audit;
pub mod authoring;
pub mod cascade;
pub mod collection;
pub mod enrollment;
pub mod guard;
pub mod invariants;
pub mod store;
pub mod tables;
pub mod template;

pub use audit::{AuditEvent, AuditLog, IntegrityViolation, Outcome};
pub use cascade::CascadeReport;
pub use enrollment::EnrollOutcome;
pub use guard::{AlternativeScope, QuestionScope, QuestionnaireScope, ResearchScope};
pub use invariants::Violation;
pub use store::{EntityStore, Snapshot, SNAPSHOT_VERSION};
pub use tables::{TableCounts, Tables};

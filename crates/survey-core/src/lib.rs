//! Survey Core - domain model of the research-management backend
//!
//! Researchers own researches; each research owns questionnaires, which own
//! questions, which own alternatives. Subjects enroll in researches and submit
//! answers. This crate holds the pure parts of that model:
//! - Records, identifiers and payloads ([`types`])
//! - The error every operation returns ([`error`])
//! - The research lifecycle state machine ([`lifecycle`])
//! - The subject eligibility filter ([`eligibility`])
//! - Typed partial updates ([`patch`])
//! - Registration identity validation ([`identity`])
//!
//! # Example
//!
//! ```rust
//! use survey_core::prelude::*;
//! use survey_core::lifecycle;
//!
//! let draft = NewResearch::new("Sleep habits", Visibility::Public);
//! let mut research = Research::new(ResearchId(1), UserId(1), draft, None);
//!
//! let change = lifecycle::toggle(&mut research, chrono::Utc::now()).unwrap();
//! assert_eq!(change.to, ResearchState::Active);
//! ```

#![allow(missing_docs)]

pub mod eligibility;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod patch;
pub mod types;

pub use eligibility::{EligibilityCriteria, SubjectProfile};
pub use error::{SurveyError, SurveyResult, TokenError, TransitionError};
pub use patch::{AlternativePatch, QuestionPatch, QuestionnairePatch, ResearchPatch};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with survey records
    pub use crate::eligibility::{EligibilityCriteria, SubjectProfile};
    pub use crate::error::{SurveyError, SurveyResult};
    pub use crate::patch::{AlternativePatch, QuestionPatch, QuestionnairePatch, ResearchPatch};
    pub use crate::types::{
        Alternative, AlternativeId, NewAlternative, NewQuestion, NewQuestionnaire, NewResearch,
        Principal, Publicity, Question, QuestionId, Questionnaire, QuestionnaireId, Research,
        ResearchId, ResearchState, SubjectId, UserId, Visibility,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

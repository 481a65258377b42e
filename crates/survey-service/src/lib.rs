//! Survey Service - the operation surface of the survey backend
//!
//! [`SurveyHandle`] implements every operation trait in [`api`] on top of the
//! transactional store. It owns the credential service (password hashing,
//! signed access tokens), the clock and the configuration; nothing is read
//! from ambient global state.
//!
//! # Example
//!
//! ```rust
//! use survey_service::prelude::*;
//!
//! let handle = SurveyHandle::new(ServiceConfig::default()).unwrap();
//! let token = handle
//!     .register_researcher(NewUser {
//!         username: "ana@example.org".into(),
//!         full_name: Some("Ana".into()),
//!         password: "s3cret".into(),
//!     })
//!     .unwrap();
//! let owner = handle.authenticate_researcher(&token.access_token).unwrap();
//! let research = handle
//!     .create_research(owner, NewResearch::new("Sleep habits", Visibility::Private))
//!     .unwrap();
//! assert!(research.code.is_some());
//! ```

#![allow(missing_docs)]

pub mod api;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod export;
pub mod handle;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LogFormat, LoggingConfig, ServiceConfig};
pub use credentials::{CredentialService, IssuedToken};
pub use handle::SurveyHandle;

/// Prelude module for common imports
pub mod prelude {
    //! Operation traits, the handle and the records they exchange
    pub use crate::api::{
        AccountManager, AlternativeOperations, QuestionOperations, QuestionnaireOperations,
        ReportingOperations, ResearchOperations, SubjectOperations,
    };
    pub use crate::config::ServiceConfig;
    pub use crate::handle::SurveyHandle;
    pub use survey_core::prelude::*;
    pub use survey_core::{AnswerInput, NewSubject, NewUser, UsageTimeInput};
    pub use survey_store::{
        AlternativeScope, CascadeReport, EnrollOutcome, QuestionScope, QuestionnaireScope,
        ResearchScope,
    };
}

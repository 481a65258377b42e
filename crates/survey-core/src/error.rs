//! Error types for the survey backend
//!
//! Provides one public error with the kinds a caller can act on:
//! - Registration failures (duplicate or malformed identity)
//! - Authentication and token failures
//! - Scoped lookups that fail, merged into `NotFoundOrForbidden`
//! - Lifecycle violations
//! - Payload, storage, export and configuration failures

use crate::types::ResearchState;

/// Result alias used across the workspace
pub type SurveyResult<T> = Result<T, SurveyError>;

/// Main survey error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
    /// Username already registered
    #[error("identity already registered: {0}")]
    DuplicateIdentity(String),

    /// Malformed email or CPF at registration
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Unknown username or wrong password
    #[error("incorrect username or password")]
    AuthenticationFailed,

    /// Token missing, expired or not verifiable
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Entity absent or outside the principal's scope; never distinguished
    #[error("entity not found")]
    NotFoundOrForbidden,

    /// Operation not legal in the current lifecycle state
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] TransitionError),

    /// Payload failed typed validation
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Snapshot read/write or decode failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Export sink failure
    #[error("export error: {0}")]
    Export(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl SurveyError {
    /// Rejected because of the request itself, not the system
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Storage(_) | Self::Export(_) | Self::Config(_)
        )
    }

    /// Credential or token problem
    #[inline]
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::InvalidToken(_))
    }

    /// HTTP-like status a transport layer can map this error to
    #[must_use]
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::DuplicateIdentity(_) | Self::InvalidIdentity(_) | Self::InvalidPayload(_) => 400,
            Self::AuthenticationFailed | Self::InvalidToken(_) => 401,
            Self::NotFoundOrForbidden => 404,
            Self::InvalidStateTransition(_) => 409,
            Self::Storage(_) | Self::Export(_) | Self::Config(_) => 500,
        }
    }

    /// Shorthand for payload validation failures
    #[inline]
    pub fn payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No token supplied
    #[error("token missing")]
    Missing,
    /// Token could not be decoded
    #[error("token malformed")]
    Malformed,
    /// Signature does not verify against the service key
    #[error("token signature invalid")]
    BadSignature,
    /// Token lifetime elapsed
    #[error("token expired")]
    Expired,
    /// Token names the other principal kind
    #[error("token issued for a different principal kind")]
    WrongPrincipal,
    /// Token principal no longer exists
    #[error("token principal unknown")]
    UnknownPrincipal,
}

/// Lifecycle rule that rejected an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Toggle invoked on a closed research
    #[error("research is closed; status cannot change")]
    AlreadyClosed,
    /// Content update outside the `inactive` state
    #[error("research content is only editable while inactive (current: {})", .0.as_str())]
    NotEditable(ResearchState),
    /// Children cannot be added to a closed research
    #[error("research is closed")]
    ResearchClosed,
    /// Answers are only accepted while active
    #[error("research is not collecting answers (current: {})", .0.as_str())]
    NotCollecting(ResearchState),
    /// Template questionnaires keep their publicity
    #[error("publicity of a template questionnaire cannot change")]
    TemplatePublicityLocked,
}

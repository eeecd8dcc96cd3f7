//! Error types for the policy decision engine.

use crate::codes::ReasonCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

/// Top-level failure taxonomy (spec §7). Every variant carries the
/// [`ReasonCode`] an endpoint reports to the caller; decision-domain denials
/// (e.g. `MaxCallsExceeded`) are not represented here — those are
/// [`crate::audit::DecisionReason`]s returned alongside `allowed: false`,
/// not engine failures.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    #[error("policy invalid: {reasons:?}")]
    PolicyInvalid { reasons: Vec<String> },

    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("session state corrupted: {reason}")]
    SessionCorrupted { reason: String },

    #[error("invalid api key")]
    InvalidApiKey,

    #[error("api key revoked")]
    ApiKeyRevoked,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("payload too large: {size} bytes exceeds {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("database unavailable: {reason}")]
    DatabaseUnavailable { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },

    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl GateError {
    /// The stable reason code a client observes for this failure.
    #[must_use]
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            GateError::PolicyNotFound { .. } => ReasonCode::PolicyNotFound,
            GateError::PolicyInvalid { .. } => ReasonCode::PolicyInvalid,
            GateError::SessionNotFound { .. } => ReasonCode::PolicyNotFound,
            GateError::SessionCorrupted { .. } => ReasonCode::SessionCorrupted,
            GateError::InvalidApiKey => ReasonCode::InvalidApiKey,
            GateError::ApiKeyRevoked => ReasonCode::ApiKeyRevoked,
            GateError::RateLimited { .. } => ReasonCode::RateLimited,
            GateError::InvalidInput { .. } => ReasonCode::InvalidInput,
            GateError::PayloadTooLarge { .. } => ReasonCode::PayloadTooLarge,
            GateError::DatabaseUnavailable { .. } => ReasonCode::DatabaseUnavailable,
            GateError::Internal { .. } | GateError::Serialization { .. } => {
                ReasonCode::InternalError
            }
        }
    }

    /// Fail-closed: every [`GateError`] implies `allowed = false`.
    #[must_use]
    pub fn allowed(&self) -> bool {
        false
    }
}

//! The stable, machine-readable error/reason code vocabulary (spec §6).

use serde::{Deserialize, Serialize};

/// A code attached to a decision reason or to a top-level failure response.
///
/// Every variant round-trips to the exact `SCREAMING_SNAKE_CASE` string named
/// in the error-code vocabulary; callers outside this workspace match on the
/// string, so the `Serialize`/`Deserialize` impls are the real contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    PolicyNotFound,
    PolicyInvalid,
    UnknownToolDenied,
    ToolExplicitlyDenied,
    SideEffectNotAllowed,
    RequiredStateNotMet,
    RequiredToolsNotCalled,
    MaxCallsExceeded,
    CooldownActive,
    CounterLimitExceeded,
    RequiredFieldMissing,
    ForbiddenFieldPresent,
    RegexMatchDenied,
    RegexMatchRequired,
    GuardConditionFailed,
    InvalidApiKey,
    ApiKeyRevoked,
    RateLimited,
    InvalidInput,
    PayloadTooLarge,
    InternalError,
    DatabaseUnavailable,
    SessionCorrupted,
    /// Informational: the call was allowed and no other reason applies.
    Allowed,
    /// Informational: a state-machine transition fired as part of this call.
    StateTransition,
}

impl ReasonCode {
    /// Whether this code, standing alone, represents a blocking outcome.
    ///
    /// `Allowed` and `StateTransition` are informational markers that can
    /// appear in the reason chain of an allowed call; every other code is a
    /// policy-domain denial reason.
    #[must_use]
    pub fn is_error(self) -> bool {
        !matches!(self, ReasonCode::Allowed | ReasonCode::StateTransition)
    }

    /// The HTTP status an endpoint should return when this code is the
    /// top-level failure reported to the caller (§6/§7). Policy-domain
    /// codes (e.g. `MaxCallsExceeded`) are carried inside a 200 response and
    /// have no meaningful top-level status; callers should not invoke this
    /// for those.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            ReasonCode::InvalidInput => 400,
            ReasonCode::PayloadTooLarge => 413,
            ReasonCode::InvalidApiKey | ReasonCode::ApiKeyRevoked => 401,
            ReasonCode::PolicyNotFound => 404,
            ReasonCode::RateLimited => 429,
            ReasonCode::InternalError
            | ReasonCode::DatabaseUnavailable
            | ReasonCode::SessionCorrupted
            | ReasonCode::PolicyInvalid => 500,
            _ => 200,
        }
    }
}

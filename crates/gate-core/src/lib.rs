//! # Gate Core
//!
//! Core types and traits shared across the runtime policy decision service:
//! the policy schema, session state, audit records, credential/rate-limit
//! rows, canonical hashing, and the error taxonomy. This crate contains no
//! evaluation logic and performs no I/O — see `policy-engine` for the
//! validator and evaluator, and `store` for persistence.

pub mod apikey;
pub mod audit;
pub mod canonical;
pub mod codes;
pub mod config;
pub mod error;
pub mod policy;
pub mod session;

pub use apikey::{ApiKey, ApiKeyId, RateLimitWindow};
pub use audit::{AuditEntry, DecisionOutcome, DecisionReason, DecisionResponse, EvaluationOutcome};
pub use canonical::{canonicalize, hash_canonical_value, hash_policy_spec};
pub use codes::ReasonCode;
pub use config::GateConfig;
pub use error::{GateError, Result};
pub use policy::{
    ActionType, CounterDef, Effect, FieldRegexRule, PolicyId, PolicyRecord, PolicySpec,
    PolicyStatus, PolicyVersion, PolicyVersionRecord, StateMachine, ToolRule, Transition,
};
pub use session::{CallRequest, Session, SessionId, SessionMutation, SessionSnapshot};

/// Current service version for compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information for telemetry and debugging.
pub const BUILD_INFO: &str = concat!(
    "gate-core ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Standard HTTP endpoints exposed by the decision and registry services.
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const RUNTIME_CHECK: &str = "/runtime-check";
    pub const POLICIES: &str = "/policies";
    pub const SESSIONS: &str = "/sessions";
    pub const AUDIT: &str = "/audit";
}

/// Limits and defaults referenced across services; concrete values live in
/// each service's `GateConfig` (spec §6 Configuration), these are fallbacks
/// used by tests and by `GateConfig::default()`.
pub mod defaults {
    pub const MAX_PAYLOAD_BYTES: usize = 1_048_576;
    pub const RATE_LIMIT_REQUESTS_PER_MINUTE: u32 = 600;
    pub const MAX_HISTORY_LENGTH: usize = 500;
    pub const API_KEY_PREFIX_LENGTH: usize = 8;
    pub const API_KEY_MIN_LENGTH: usize = 24;
    pub const REQUEST_DEADLINE_MS: u64 = 5_000;
}

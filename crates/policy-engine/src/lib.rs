//! The policy validator and deterministic evaluator: the decision-making
//! core of the runtime policy service. Contains no persistence and no
//! network code — see `store` and the service crates for those.

mod engine;
pub mod guard;
pub mod jsonpath;
mod validate;

pub use engine::{evaluate, validate_policy, Evaluator, RegexCache, ValidationIssue};

pub use gate_core;

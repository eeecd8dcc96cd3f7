//! Credential and rate gate (C5): authenticates presented API keys in
//! constant time and enforces a per-key sliding-minute request ceiling.
//!
//! Persistence (candidate-key lookup, window counters) belongs to `store`;
//! this crate defines the traits that boundary crosses and implements the
//! comparison and throttling logic on top of them.

mod apikey_gate;
mod rate_limiter;

pub use apikey_gate::{hash_secret, ApiKeyGate, PresentedKey};
pub use rate_limiter::{RateLimiter, WindowCounter};

pub use gate_core;

//! Postgres-backed persistence for the policy decision service: the policy
//! store (C3), session store (C4), API key candidate lookup and rate-limit
//! window counter (C5), and the audit sink (C6). Every query is runtime-bound
//! (`sqlx::query`/`query_as`, no `query!` macro) since this crate is built
//! without a live database to check compile-time query metadata against.

mod apikey_store;
mod audit_store;
mod error;
mod policy_store;
mod pool;
mod rate_limit_store;
mod session_store;

pub use apikey_store::{ApiKeyStore, PgApiKeyStore};
pub use audit_store::PgAuditStore;
pub use policy_store::{PgPolicyStore, PolicyStore};
pub use pool::connect;
pub use rate_limit_store::PgRateLimitStore;
pub use session_store::{LockedSession, PgSessionStore, SessionStore};

//! C5 candidate lookup: bounded, prefix-indexed, revocation-filtered.

use crate::error::map_sqlx_err;
use async_trait::async_trait;
use gate_core::{ApiKey, GateError};
use sqlx::{PgPool, Row};

/// Candidates are capped well below any plausible prefix-collision count;
/// the constant-time compare in `credential-gate` still runs once per
/// candidate, so an unbounded result set would turn authentication into an
/// unbounded-cost operation.
const MAX_CANDIDATES: i64 = 16;

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn candidates_for_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKey>, GateError>;
}

pub struct PgApiKeyStore {
    pool: PgPool,
}

impl PgApiKeyStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    /// Candidates include revoked rows: a presented secret that hashes to a
    /// revoked row must surface `API_KEY_REVOKED` rather than
    /// `INVALID_API_KEY` (§4.5 point 4), so revocation is checked after the
    /// hash compare, not filtered out of the candidate set beforehand.
    async fn candidates_for_prefix(&self, key_prefix: &str) -> Result<Vec<ApiKey>, GateError> {
        let rows = sqlx::query(
            "SELECT id, env_id, key_prefix, key_hash, revoked_at FROM api_keys
             WHERE key_prefix = $1
             LIMIT $2",
        )
        .bind(key_prefix)
        .bind(MAX_CANDIDATES)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter()
            .map(|row| {
                Ok(ApiKey {
                    id: row.try_get("id").map_err(map_sqlx_err)?,
                    env_id: row.try_get("env_id").map_err(map_sqlx_err)?,
                    key_prefix: row.try_get("key_prefix").map_err(map_sqlx_err)?,
                    key_hash: row.try_get("key_hash").map_err(map_sqlx_err)?,
                    revoked_at: row.try_get("revoked_at").map_err(map_sqlx_err)?,
                })
            })
            .collect()
    }
}

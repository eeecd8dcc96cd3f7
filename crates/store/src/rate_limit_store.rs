//! C5 sliding-minute window counter: atomic upsert-increment.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use credential_gate::WindowCounter;
use gate_core::{ApiKeyId, GateError};
use sqlx::{PgPool, Row};

pub struct PgRateLimitStore {
    pool: PgPool,
}

impl PgRateLimitStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn window_start_timestamp(window_start_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(window_start_ms)
        .single()
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl WindowCounter for PgRateLimitStore {
    async fn increment_and_get(
        &self,
        api_key_id: ApiKeyId,
        window_start_ms: i64,
    ) -> Result<i64, GateError> {
        let window_start = window_start_timestamp(window_start_ms);

        let row = sqlx::query(
            "INSERT INTO rate_limit_windows (api_key_id, window_start, request_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (api_key_id, window_start)
             DO UPDATE SET request_count = rate_limit_windows.request_count + 1
             RETURNING request_count",
        )
        .bind(api_key_id)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
        .map_err(crate::error::map_sqlx_err)?;

        row.try_get("request_count").map_err(crate::error::map_sqlx_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_converts_minute_floor_ms_to_a_timestamp() {
        let ts = window_start_timestamp(120_000);
        assert_eq!(ts.timestamp_millis(), 120_000);
    }
}

//! Credential and rate-limit types (spec §3 ApiKey, RateLimitWindow, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ApiKeyId = Uuid;

/// A stored API key. The raw secret is never stored — only its prefix (for
/// candidate lookup) and a SHA-256 hash (for verification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub env_id: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// A one-minute sliding window request counter for one API key
/// (spec §3 RateLimitWindow, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub api_key_id: ApiKeyId,
    pub window_start: DateTime<Utc>,
    pub request_count: i64,
}

/// Floor `timestamp_ms` to the minute boundary that identifies its sliding
/// window (spec §4.5: `windowStart = floor(nowMs / 60000) * 60000`).
#[must_use]
pub fn window_start_ms(timestamp_ms: i64) -> i64 {
    (timestamp_ms / 60_000) * 60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_floors_to_minute_boundary() {
        assert_eq!(window_start_ms(0), 0);
        assert_eq!(window_start_ms(59_999), 0);
        assert_eq!(window_start_ms(60_000), 60_000);
        assert_eq!(window_start_ms(125_000), 120_000);
    }
}

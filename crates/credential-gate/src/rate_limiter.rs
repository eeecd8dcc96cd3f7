//! Sliding-minute rate limiting (C5, spec §4.5 points 5-6).
//!
//! The window-floor computation lives in `gate_core::window_start_ms`; the
//! atomic upsert-increment itself is a store concern (`ON CONFLICT ... DO
//! UPDATE ... RETURNING request_count`), abstracted here behind
//! [`WindowCounter`] so this crate stays free of any database dependency.

use async_trait::async_trait;
use gate_core::{window_start_ms, ApiKeyId, GateError};
use tracing::instrument;

/// Atomically increments and returns the request count for one
/// `(apiKeyId, windowStart)` row, creating it at count 1 if absent.
#[async_trait]
pub trait WindowCounter: Send + Sync {
    async fn increment_and_get(
        &self,
        api_key_id: ApiKeyId,
        window_start_ms: i64,
    ) -> Result<i64, GateError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    requests_per_minute: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        Self { requests_per_minute }
    }

    /// Increment the window for `api_key_id` at `now_ms` and enforce the
    /// per-minute ceiling. `RATE_LIMITED` always carries a 60 second retry
    /// hint (the window always closes within the next minute boundary).
    #[instrument(skip(self, counter), fields(requests_per_minute = self.requests_per_minute))]
    pub async fn check<C: WindowCounter + ?Sized>(
        &self,
        counter: &C,
        api_key_id: ApiKeyId,
        now_ms: i64,
    ) -> Result<(), GateError> {
        let window = window_start_ms(now_ms);
        let count = counter.increment_and_get(api_key_id, window).await?;
        if count > i64::from(self.requests_per_minute) {
            return Err(GateError::RateLimited {
                retry_after_secs: 60,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use uuid::Uuid;

    struct FixedCounter(AtomicI64);

    #[async_trait]
    impl WindowCounter for FixedCounter {
        async fn increment_and_get(
            &self,
            _api_key_id: ApiKeyId,
            _window_start_ms: i64,
        ) -> Result<i64, GateError> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test]
    async fn allows_calls_under_the_ceiling() {
        let limiter = RateLimiter::new(3);
        let counter = FixedCounter(AtomicI64::new(0));
        let key_id = Uuid::new_v4();
        for _ in 0..3 {
            limiter.check(&counter, key_id, 0).await.unwrap();
        }
    }

    #[tokio::test]
    async fn blocks_once_the_ceiling_is_exceeded() {
        let limiter = RateLimiter::new(2);
        let counter = FixedCounter(AtomicI64::new(0));
        let key_id = Uuid::new_v4();
        limiter.check(&counter, key_id, 0).await.unwrap();
        limiter.check(&counter, key_id, 0).await.unwrap();
        let err = limiter.check(&counter, key_id, 0).await.unwrap_err();
        match err {
            GateError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}

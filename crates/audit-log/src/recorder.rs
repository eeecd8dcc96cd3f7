//! Append-only audit recording (C6, spec §4.6).
//!
//! Grounded on `PolicyAuditor`'s wrap-and-record shape: a thin layer that
//! turns a decision into a row and appends it, while keeping the actual
//! storage behind a trait the `store` crate implements.

use async_trait::async_trait;
use gate_core::{AuditEntry, GateError};
use tracing::{error, instrument};

/// Durable sink for [`AuditEntry`] rows. Implemented by `store` against
/// Postgres; append-only, never mutated once written.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), GateError>;
}

/// Records decisions without letting a storage failure change a response
/// that has already been computed and returned to the caller (spec §4.6:
/// "A failed audit write is logged but does not change the response").
#[derive(Debug, Default)]
pub struct AuditRecorder;

impl AuditRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, sink, entry), fields(session_id = %entry.execution_session_id, tool_name = %entry.tool_name))]
    pub async fn record<S: AuditSink + ?Sized>(&self, sink: &S, entry: AuditEntry) {
        if let Err(err) = sink.append(entry).await {
            error!(error = %err, "audit append failed; response already committed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_core::{ActionType, DecisionOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    struct CountingSink {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AuditSink for CountingSink {
        async fn append(&self, _entry: AuditEntry) -> Result<(), GateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GateError::DatabaseUnavailable {
                    reason: "simulated".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn sample_entry() -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4(),
            execution_session_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            tool_name: "refund_payment".to_string(),
            action_type: Some(ActionType::SideEffect),
            redacted_payload: serde_json::json!({}),
            decision: DecisionOutcome::Allowed,
            reasons: vec![],
            error_code: None,
            policy_id: Uuid::new_v4(),
            policy_version_used: 1,
            policy_hash: "deadbeef".to_string(),
            state_before: "initial".to_string(),
            state_after: "initial".to_string(),
            counters_before: Default::default(),
            counters_after: Default::default(),
            execution_duration_ms: 3,
        }
    }

    #[tokio::test]
    async fn successful_append_is_recorded_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            calls: calls.clone(),
            fail: false,
        };
        AuditRecorder::new().record(&sink, sample_entry()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_append_does_not_panic_or_propagate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            calls: calls.clone(),
            fail: true,
        };
        AuditRecorder::new().record(&sink, sample_entry()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

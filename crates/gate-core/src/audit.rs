//! Decisions, reason chains, and the audit log row (spec §3 AuditEntry,
//! §4.2 evaluator output, §6 response shape).

use crate::codes::ReasonCode;
use crate::policy::{PolicyId, PolicyVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One entry in a decision's reason chain. `rule_ref` names the tool or
/// transition the reason pertains to, when applicable. `is_error` carries
/// `ReasonCode::is_error()` onto the wire so a reason chain can mix
/// informational entries (`ALLOWED`, `STATE_TRANSITION`) with blocking ones
/// without needing a second, separate sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionReason {
    pub code: ReasonCode,
    pub message: String,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_ref: Option<String>,
}

impl DecisionReason {
    #[must_use]
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            is_error: code.is_error(),
            rule_ref: None,
        }
    }

    #[must_use]
    pub fn with_rule_ref(mut self, rule_ref: impl Into<String>) -> Self {
        self.rule_ref = Some(rule_ref.into());
        self
    }
}

/// The evaluator's pure output (spec §4.2 signature). `error_code` is the
/// first denying check's code, or `None` when `allowed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ReasonCode>,
    pub reasons: Vec<DecisionReason>,
    pub new_state: String,
    pub new_counters: HashMap<String, i64>,
    pub new_tool_call_counts: HashMap<String, u64>,
}

/// Allow/block outcome (spec §3 AuditEntry `decision` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Allowed,
    Blocked,
}

impl From<bool> for DecisionOutcome {
    fn from(allowed: bool) -> Self {
        if allowed {
            DecisionOutcome::Allowed
        } else {
            DecisionOutcome::Blocked
        }
    }
}

/// The immutable, append-only audit row written once per request
/// (spec §3 AuditEntry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub execution_session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<crate::policy::ActionType>,
    pub redacted_payload: Value,
    pub decision: DecisionOutcome,
    pub reasons: Vec<DecisionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ReasonCode>,
    pub policy_id: PolicyId,
    pub policy_version_used: PolicyVersion,
    pub policy_hash: String,
    pub state_before: String,
    pub state_after: String,
    pub counters_before: HashMap<String, i64>,
    pub counters_after: HashMap<String, i64>,
    pub execution_duration_ms: i64,
}

/// The `POST /runtime-check` success/failure response body (spec §6). Every
/// response, success or failure, shares this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ReasonCode>,
    pub decision_reasons: Vec<DecisionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version_used: Option<PolicyVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<HashMap<String, i64>>,
    pub execution_duration_ms: i64,
}

//! The policy document schema (spec §3, §4.1).
//!
//! `PolicySpec` is the declarative document a [`crate::error::GateError`]-free
//! publish commits to immutable storage. Nothing in this module performs
//! validation or evaluation — see `policy-engine` for both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type PolicyId = Uuid;
pub type PolicyVersion = i64;

/// The two decisions a rule or a policy default can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// Classification of what a tool call does, used by the side-effect gate
/// (spec §4.2 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Read,
    Write,
    SideEffect,
}

/// A `{jsonPath, pattern}` regex constraint used by `denyIfRegexMatch` and
/// `allowOnlyIfRegexMatch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRegexRule {
    pub json_path: String,
    pub pattern: String,
}

/// One tool's enforcement rule. `tool_name` is the unique key within a
/// [`PolicySpec`]'s `tool_rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRule {
    pub tool_name: String,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calls_per_session: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_previous_tool_calls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_if_fields_present: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_if_regex_match: Option<Vec<FieldRegexRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_only_if_regex_match: Option<Vec<FieldRegexRule>>,
}

/// One edge of a [`StateMachine`]: `(from_state, triggered_by_tool) ->
/// to_state`, optionally gated by a guard and prior-tool-call requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from_state: String,
    pub to_state: String,
    pub triggered_by_tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_tools_called_before: Option<Vec<String>>,
    /// A single-comparison expression: `counterName OP integer`. See
    /// `policy_engine::guard` for the grammar and evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets_counters: Option<HashMap<String, i64>>,
}

impl Transition {
    /// A transition is a self-loop when it starts and ends in the same
    /// state; the validator rejects self-loops without a guard (§4.1).
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from_state == self.to_state
    }
}

/// The optional per-session state machine a policy may declare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachine {
    pub states: Vec<String>,
    pub initial_state: String,
    pub transitions: Vec<Transition>,
}

/// A session-scoped counter declared by a policy. `scope` is always
/// `"session"` in v1 but is kept on the wire for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDef {
    pub name: String,
    #[serde(default = "CounterDef::default_scope")]
    pub scope: String,
    pub initial_value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

impl CounterDef {
    fn default_scope() -> String {
        "session".to_string()
    }
}

/// The declarative policy document (spec §3). Canonicalization and hashing
/// live in [`crate::canonical`]; schema validation lives in `policy-engine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    pub version: String,
    pub default_decision: Effect,
    pub tool_rules: Vec<ToolRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<StateMachine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Vec<CounterDef>>,
}

impl PolicySpec {
    /// Look up a declared rule by tool name. `tool_rules` is small (tens of
    /// entries in practice) so a linear scan keeps the evaluator free of a
    /// second owned index structure to keep in sync with the spec's vector.
    #[must_use]
    pub fn rule_for(&self, tool_name: &str) -> Option<&ToolRule> {
        self.tool_rules.iter().find(|r| r.tool_name == tool_name)
    }

    /// The initial state a new session pins: the state machine's declared
    /// `initialState`, or the literal `"initial"` when no state machine is
    /// present (spec §3 Session invariants).
    #[must_use]
    pub fn initial_state(&self) -> &str {
        self.state_machine
            .as_ref()
            .map(|sm| sm.initial_state.as_str())
            .unwrap_or("initial")
    }
}

/// Status of a mutable [`PolicyRecord`] draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Draft,
    Published,
    Archived,
}

/// Mutable draft/published record bound to one environment (spec §3).
/// `version` only changes on [`crate::policy::PolicyStatus::Published`]
/// transitions performed by `PolicyStore::publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub env_id: String,
    pub name: String,
    pub version: PolicyVersion,
    pub status: PolicyStatus,
    pub spec: PolicySpec,
    pub hash: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An immutable row written on every publish. `(policy_id, version)` is
/// unique and, once written, this record is never mutated (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersionRecord {
    pub policy_id: PolicyId,
    pub version: PolicyVersion,
    pub spec: PolicySpec,
    pub hash: String,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub published_by: Option<String>,
}

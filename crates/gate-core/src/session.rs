//! Session state (spec §3 Session, Session invariants).

use crate::policy::{PolicyId, PolicyVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Persistent per-agent, per-`sessionId` execution context. Pins a policy
/// version at creation (`policy_version_locked` never changes thereafter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub env_id: String,
    /// The caller-supplied session key; unique together with `env_id`.
    pub session_id: String,
    pub agent_id: String,
    pub policy_id: PolicyId,
    pub policy_version_locked: PolicyVersion,
    pub initial_state: String,
    pub current_state: String,
    pub counters: HashMap<String, i64>,
    pub tool_calls_history: Vec<String>,
    pub tool_call_counts: HashMap<String, u64>,
    pub last_tool_call_times: HashMap<String, i64>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session pinned to `policy_id`/`policy_version` at the given
    /// `initial_state`, with empty history/counters. Counters are seeded
    /// from the policy's `CounterDef::initial_value`s by the caller
    /// (`gate-core` has no policy-engine dependency to do this itself).
    #[must_use]
    pub fn new(
        env_id: String,
        session_id: String,
        agent_id: String,
        policy_id: PolicyId,
        policy_version_locked: PolicyVersion,
        initial_state: String,
        counters: HashMap<String, i64>,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            env_id,
            session_id,
            agent_id,
            policy_id,
            policy_version_locked,
            current_state: initial_state.clone(),
            initial_state,
            counters,
            tool_calls_history: Vec::new(),
            tool_call_counts: HashMap::new(),
            last_tool_call_times: HashMap::new(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// A read-only snapshot for the evaluator, decoupled from storage
    /// representation so `policy-engine` need not depend on persistence
    /// types.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_state: self.current_state.clone(),
            counters: self.counters.clone(),
            tool_calls_history: self.tool_calls_history.clone(),
            tool_call_counts: self.tool_call_counts.clone(),
            last_tool_call_times: self.last_tool_call_times.clone(),
        }
    }
}

/// Immutable view of session state passed into the pure evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    pub current_state: String,
    pub counters: HashMap<String, i64>,
    pub tool_calls_history: Vec<String>,
    pub tool_call_counts: HashMap<String, u64>,
    pub last_tool_call_times: HashMap<String, i64>,
}

/// A single tool-invocation request submitted for a decision (spec §6
/// request body).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub session_id: String,
    pub agent_id: String,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<crate::policy::ActionType>,
    #[serde(default = "default_payload")]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

fn default_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

/// The five co-varying fields a session mutation advances atomically
/// (spec §4.4, §5).
#[derive(Debug, Clone)]
pub struct SessionMutation {
    pub new_state: String,
    pub new_counters: HashMap<String, i64>,
    pub new_history: Vec<String>,
    pub new_tool_call_counts: HashMap<String, u64>,
    pub new_last_tool_call_times: HashMap<String, i64>,
}

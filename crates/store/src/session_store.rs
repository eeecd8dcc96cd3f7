//! C4 Session Store: creation, row locking, and atomic state mutation.

use crate::error::map_sqlx_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_core::{
    GateError, PolicyId, PolicyVersion, Session, SessionId, SessionMutation,
};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the existing row on a `(env_id, session_id)` conflict rather
    /// than erroring — concurrent creators must resolve to a single row
    /// (spec §5 ordering guarantees).
    async fn get_or_create(
        &self,
        env_id: &str,
        session_id: &str,
        agent_id: &str,
        policy_id: PolicyId,
        policy_version_locked: PolicyVersion,
        initial_state: &str,
        initial_counters: std::collections::HashMap<String, i64>,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Result<Session, GateError>;

    /// Holds a row-level write lock on the session for the caller's
    /// critical section; released when the returned guard is dropped
    /// (commit/rollback of the underlying transaction).
    async fn lock(&self, session_id: SessionId) -> Result<LockedSession, GateError>;
}

pub struct LockedSession {
    tx: Transaction<'static, Postgres>,
    pub session: Session,
}

impl LockedSession {
    /// Writes the five co-varying fields this call advanced and releases
    /// the lock by committing.
    pub async fn update_state(mut self, mutation: SessionMutation, now: DateTime<Utc>) -> Result<(), GateError> {
        let counters = serde_json::to_value(&mutation.new_counters)?;
        let history = serde_json::to_value(&mutation.new_history)?;
        let counts = serde_json::to_value(&mutation.new_tool_call_counts)?;
        let last_times = serde_json::to_value(&mutation.new_last_tool_call_times)?;

        sqlx::query(
            "UPDATE sessions SET current_state = $1, counters = $2, tool_calls_history = $3,
             tool_call_counts = $4, last_tool_call_times = $5, updated_at = $6
             WHERE id = $7",
        )
        .bind(&mutation.new_state)
        .bind(&counters)
        .bind(&history)
        .bind(&counts)
        .bind(&last_times)
        .bind(now)
        .bind(self.session.id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        self.tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    /// Releases the lock without writing anything, for a blocked call that
    /// leaves session state untouched.
    pub async fn release(self) -> Result<(), GateError> {
        self.tx.commit().await.map_err(map_sqlx_err)
    }
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> Result<Session, GateError> {
    let counters_value: Value = row.try_get("counters").map_err(map_sqlx_err)?;
    let history_value: Value = row.try_get("tool_calls_history").map_err(map_sqlx_err)?;
    let counts_value: Value = row.try_get("tool_call_counts").map_err(map_sqlx_err)?;
    let last_times_value: Value = row.try_get("last_tool_call_times").map_err(map_sqlx_err)?;

    Ok(Session {
        id: row.try_get("id").map_err(map_sqlx_err)?,
        env_id: row.try_get("env_id").map_err(map_sqlx_err)?,
        session_id: row.try_get("session_id").map_err(map_sqlx_err)?,
        agent_id: row.try_get("agent_id").map_err(map_sqlx_err)?,
        policy_id: row.try_get("policy_id").map_err(map_sqlx_err)?,
        policy_version_locked: row.try_get("policy_version_locked").map_err(map_sqlx_err)?,
        initial_state: row.try_get("initial_state").map_err(map_sqlx_err)?,
        current_state: row.try_get("current_state").map_err(map_sqlx_err)?,
        counters: serde_json::from_value(counters_value)?,
        tool_calls_history: serde_json::from_value(history_value)?,
        tool_call_counts: serde_json::from_value(counts_value)?,
        last_tool_call_times: serde_json::from_value(last_times_value)?,
        metadata: row.try_get("metadata").map_err(map_sqlx_err)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_err)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_err)?,
    })
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get_or_create(
        &self,
        env_id: &str,
        session_id: &str,
        agent_id: &str,
        policy_id: PolicyId,
        policy_version_locked: PolicyVersion,
        initial_state: &str,
        initial_counters: std::collections::HashMap<String, i64>,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Result<Session, GateError> {
        let id = Uuid::new_v4();
        let counters_value = serde_json::to_value(&initial_counters)?;

        let inserted = sqlx::query(
            "INSERT INTO sessions
             (id, env_id, session_id, agent_id, policy_id, policy_version_locked,
              initial_state, current_state, counters, tool_calls_history,
              tool_call_counts, last_tool_call_times, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, '[]', '{}', '{}', $9, $10, $10)
             ON CONFLICT (env_id, session_id) DO NOTHING
             RETURNING id, env_id, session_id, agent_id, policy_id, policy_version_locked,
                       initial_state, current_state, counters, tool_calls_history,
                       tool_call_counts, last_tool_call_times, metadata, created_at, updated_at",
        )
        .bind(id)
        .bind(env_id)
        .bind(session_id)
        .bind(agent_id)
        .bind(policy_id)
        .bind(policy_version_locked)
        .bind(initial_state)
        .bind(&counters_value)
        .bind(&metadata)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if let Some(row) = inserted {
            return row_to_session(&row);
        }

        let existing = sqlx::query(
            "SELECT id, env_id, session_id, agent_id, policy_id, policy_version_locked,
                    initial_state, current_state, counters, tool_calls_history,
                    tool_call_counts, last_tool_call_times, metadata, created_at, updated_at
             FROM sessions WHERE env_id = $1 AND session_id = $2",
        )
        .bind(env_id)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row_to_session(&existing)
    }

    async fn lock(&self, session_id: SessionId) -> Result<LockedSession, GateError> {
        let mut tx: Transaction<'static, Postgres> =
            self.pool.begin().await.map_err(map_sqlx_err)?;

        let row = sqlx::query(
            "SELECT id, env_id, session_id, agent_id, policy_id, policy_version_locked,
                    initial_state, current_state, counters, tool_calls_history,
                    tool_call_counts, last_tool_call_times, metadata, created_at, updated_at
             FROM sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| GateError::SessionNotFound {
            session_id: session_id.to_string(),
        })?;

        let session = row_to_session(&row)?;
        Ok(LockedSession { tx, session })
    }
}

impl PgSessionStore {
    /// Plain unlocked read, for `policy-registry`'s `GET /sessions/:id`
    /// operator endpoint. Never used by the decision path, which always
    /// goes through `lock`.
    pub async fn get_by_id(&self, session_id: SessionId) -> Result<Option<Session>, GateError> {
        let row = sqlx::query(
            "SELECT id, env_id, session_id, agent_id, policy_id, policy_version_locked,
                    initial_state, current_state, counters, tool_calls_history,
                    tool_call_counts, last_tool_call_times, metadata, created_at, updated_at
             FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref().map(row_to_session).transpose()
    }
}

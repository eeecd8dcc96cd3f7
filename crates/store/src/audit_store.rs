//! C6 append-only audit insert, plus the read-only lookups `policy-registry`
//! needs for operator inspection.

use async_trait::async_trait;
use audit_log::AuditSink;
use gate_core::{AuditEntry, DecisionOutcome, GateError};
use sqlx::{PgPool, Row};

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every audit row for one session, oldest first. Read-only; used by
    /// `policy-registry`'s `GET /audit` operator endpoint, never by the
    /// decision path.
    pub async fn list_for_session(&self, session_id: uuid::Uuid) -> Result<Vec<AuditEntry>, GateError> {
        let rows = sqlx::query(
            "SELECT id, execution_session_id, timestamp, tool_name, action_type, redacted_payload,
                    decision, reasons, error_code, policy_id, policy_version_used, policy_hash,
                    state_before, state_after, counters_before, counters_after, execution_duration_ms
             FROM audit_entries WHERE execution_session_id = $1 ORDER BY timestamp ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(crate::error::map_sqlx_err)?;

        rows.iter().map(row_to_audit_entry).collect()
    }
}

fn row_to_audit_entry(row: &sqlx::postgres::PgRow) -> Result<AuditEntry, GateError> {
    let decision_str: String = row.try_get("decision").map_err(crate::error::map_sqlx_err)?;
    let decision = match decision_str.as_str() {
        "allowed" => DecisionOutcome::Allowed,
        "blocked" => DecisionOutcome::Blocked,
        other => {
            return Err(GateError::Internal {
                reason: format!("unknown audit decision '{other}'"),
            })
        }
    };
    let action_type_str: Option<String> = row.try_get("action_type").map_err(crate::error::map_sqlx_err)?;
    let action_type = action_type_str
        .map(|s| serde_json::from_value(serde_json::Value::String(s)))
        .transpose()?;
    let error_code_str: Option<String> = row.try_get("error_code").map_err(crate::error::map_sqlx_err)?;
    let error_code = error_code_str
        .map(|s| serde_json::from_value(serde_json::Value::String(s)))
        .transpose()?;
    let reasons_value: serde_json::Value = row.try_get("reasons").map_err(crate::error::map_sqlx_err)?;
    let counters_before_value: serde_json::Value =
        row.try_get("counters_before").map_err(crate::error::map_sqlx_err)?;
    let counters_after_value: serde_json::Value =
        row.try_get("counters_after").map_err(crate::error::map_sqlx_err)?;

    Ok(AuditEntry {
        id: row.try_get("id").map_err(crate::error::map_sqlx_err)?,
        execution_session_id: row.try_get("execution_session_id").map_err(crate::error::map_sqlx_err)?,
        timestamp: row.try_get("timestamp").map_err(crate::error::map_sqlx_err)?,
        tool_name: row.try_get("tool_name").map_err(crate::error::map_sqlx_err)?,
        action_type,
        redacted_payload: row.try_get("redacted_payload").map_err(crate::error::map_sqlx_err)?,
        decision,
        reasons: serde_json::from_value(reasons_value)?,
        error_code,
        policy_id: row.try_get("policy_id").map_err(crate::error::map_sqlx_err)?,
        policy_version_used: row.try_get("policy_version_used").map_err(crate::error::map_sqlx_err)?,
        policy_hash: row.try_get("policy_hash").map_err(crate::error::map_sqlx_err)?,
        state_before: row.try_get("state_before").map_err(crate::error::map_sqlx_err)?,
        state_after: row.try_get("state_after").map_err(crate::error::map_sqlx_err)?,
        counters_before: serde_json::from_value(counters_before_value)?,
        counters_after: serde_json::from_value(counters_after_value)?,
        execution_duration_ms: row.try_get("execution_duration_ms").map_err(crate::error::map_sqlx_err)?,
    })
}

#[async_trait]
impl AuditSink for PgAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), GateError> {
        let decision_str = match entry.decision {
            DecisionOutcome::Allowed => "allowed",
            DecisionOutcome::Blocked => "blocked",
        };
        let action_type = entry
            .action_type
            .map(|a| serde_json::to_value(a))
            .transpose()?
            .and_then(|v| v.as_str().map(str::to_string));
        let reasons = serde_json::to_value(&entry.reasons)?;
        let error_code = entry
            .error_code
            .map(serde_json::to_value)
            .transpose()?
            .and_then(|v| v.as_str().map(str::to_string));
        let counters_before = serde_json::to_value(&entry.counters_before)?;
        let counters_after = serde_json::to_value(&entry.counters_after)?;

        sqlx::query(
            "INSERT INTO audit_entries
             (id, execution_session_id, timestamp, tool_name, action_type, redacted_payload,
              decision, reasons, error_code, policy_id, policy_version_used, policy_hash,
              state_before, state_after, counters_before, counters_after, execution_duration_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(entry.id)
        .bind(entry.execution_session_id)
        .bind(entry.timestamp)
        .bind(&entry.tool_name)
        .bind(&action_type)
        .bind(&entry.redacted_payload)
        .bind(decision_str)
        .bind(&reasons)
        .bind(&error_code)
        .bind(entry.policy_id)
        .bind(entry.policy_version_used)
        .bind(&entry.policy_hash)
        .bind(&entry.state_before)
        .bind(&entry.state_after)
        .bind(&counters_before)
        .bind(&counters_after)
        .bind(entry.execution_duration_ms)
        .execute(&self.pool)
        .await
        .map_err(crate::error::map_sqlx_err)?;

        Ok(())
    }
}

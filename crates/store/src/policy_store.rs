//! C3 Policy Store: drafts, publishes, and version-locked retrieval.

use crate::error::map_sqlx_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_core::{
    hash_policy_spec, GateError, PolicyId, PolicyRecord, PolicySpec, PolicyStatus,
    PolicyVersion, PolicyVersionRecord,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn create_draft(&self, env_id: &str, name: &str, spec: PolicySpec) -> Result<PolicyRecord, GateError>;
    async fn save_draft(&self, policy_id: PolicyId, spec: PolicySpec) -> Result<PolicyRecord, GateError>;
    async fn publish(
        &self,
        policy_id: PolicyId,
        published_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PolicyRecord, GateError>;
    async fn get_published(&self, env_id: &str) -> Result<Option<PolicyRecord>, GateError>;
    async fn get_by_id_and_version(
        &self,
        policy_id: PolicyId,
        version: PolicyVersion,
    ) -> Result<Option<PolicyVersionRecord>, GateError>;
}

pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn validate_or_err(spec: &PolicySpec) -> Result<(), GateError> {
    let issues = policy_engine::validate_policy(spec);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(GateError::PolicyInvalid {
            reasons: issues
                .into_iter()
                .map(|i| format!("{}: {} ({})", i.path, i.message, i.code))
                .collect(),
        })
    }
}

fn row_to_policy_record(row: &sqlx::postgres::PgRow) -> Result<PolicyRecord, GateError> {
    let status_str: String = row.try_get("status").map_err(map_sqlx_err)?;
    let status = match status_str.as_str() {
        "draft" => PolicyStatus::Draft,
        "published" => PolicyStatus::Published,
        "archived" => PolicyStatus::Archived,
        other => {
            return Err(GateError::Internal {
                reason: format!("unknown policy status {other}"),
            })
        }
    };
    let spec_value: serde_json::Value = row.try_get("spec").map_err(map_sqlx_err)?;
    let spec: PolicySpec = serde_json::from_value(spec_value)?;
    Ok(PolicyRecord {
        id: row.try_get("id").map_err(map_sqlx_err)?,
        env_id: row.try_get("env_id").map_err(map_sqlx_err)?,
        name: row.try_get("name").map_err(map_sqlx_err)?,
        version: row.try_get("version").map_err(map_sqlx_err)?,
        status,
        spec,
        hash: row.try_get("hash").map_err(map_sqlx_err)?,
        published_at: row.try_get("published_at").map_err(map_sqlx_err)?,
    })
}

fn row_to_version_record(row: &sqlx::postgres::PgRow) -> Result<PolicyVersionRecord, GateError> {
    let spec_value: serde_json::Value = row.try_get("spec").map_err(map_sqlx_err)?;
    let spec: PolicySpec = serde_json::from_value(spec_value)?;
    Ok(PolicyVersionRecord {
        policy_id: row.try_get("policy_id").map_err(map_sqlx_err)?,
        version: row.try_get("version").map_err(map_sqlx_err)?,
        spec,
        hash: row.try_get("hash").map_err(map_sqlx_err)?,
        published_at: row.try_get("published_at").map_err(map_sqlx_err)?,
        published_by: row.try_get("published_by").map_err(map_sqlx_err)?,
    })
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn create_draft(
        &self,
        env_id: &str,
        name: &str,
        spec: PolicySpec,
    ) -> Result<PolicyRecord, GateError> {
        validate_or_err(&spec)?;
        let id = Uuid::new_v4();
        let hash = hash_policy_spec(&spec);
        let spec_value = serde_json::to_value(&spec)?;

        sqlx::query(
            "INSERT INTO policies (id, env_id, name, version, status, spec, hash, published_at)
             VALUES ($1, $2, $3, 0, 'draft', $4, $5, NULL)",
        )
        .bind(id)
        .bind(env_id)
        .bind(name)
        .bind(&spec_value)
        .bind(&hash)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(PolicyRecord {
            id,
            env_id: env_id.to_string(),
            name: name.to_string(),
            version: 0,
            status: PolicyStatus::Draft,
            spec,
            hash,
            published_at: None,
        })
    }

    async fn save_draft(&self, policy_id: PolicyId, spec: PolicySpec) -> Result<PolicyRecord, GateError> {
        validate_or_err(&spec)?;
        let hash = hash_policy_spec(&spec);
        let spec_value = serde_json::to_value(&spec)?;

        let row = sqlx::query(
            "UPDATE policies SET spec = $1, hash = $2
             WHERE id = $3 AND status = 'draft'
             RETURNING id, env_id, name, version, status, spec, hash, published_at",
        )
        .bind(&spec_value)
        .bind(&hash)
        .bind(policy_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => row_to_policy_record(&row),
            None => Err(GateError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            }),
        }
    }

    async fn publish(
        &self,
        policy_id: PolicyId,
        published_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PolicyRecord, GateError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let locked = sqlx::query("SELECT version, spec, hash FROM policies WHERE id = $1 FOR UPDATE")
            .bind(policy_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| GateError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })?;

        let current_version: PolicyVersion = locked.try_get("version").map_err(map_sqlx_err)?;
        let spec_value: serde_json::Value = locked.try_get("spec").map_err(map_sqlx_err)?;
        let hash: String = locked.try_get("hash").map_err(map_sqlx_err)?;
        let next_version = current_version + 1;

        let row = sqlx::query(
            "UPDATE policies SET version = $1, status = 'published', published_at = $2
             WHERE id = $3
             RETURNING id, env_id, name, version, status, spec, hash, published_at",
        )
        .bind(next_version)
        .bind(now)
        .bind(policy_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO policy_version_records (policy_id, version, spec, hash, published_at, published_by)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(policy_id)
        .bind(next_version)
        .bind(&spec_value)
        .bind(&hash)
        .bind(now)
        .bind(&published_by)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        row_to_policy_record(&row)
    }

    async fn get_published(&self, env_id: &str) -> Result<Option<PolicyRecord>, GateError> {
        let row = sqlx::query(
            "SELECT id, env_id, name, version, status, spec, hash, published_at
             FROM policies WHERE env_id = $1 AND status = 'published'",
        )
        .bind(env_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref().map(row_to_policy_record).transpose()
    }

    async fn get_by_id_and_version(
        &self,
        policy_id: PolicyId,
        version: PolicyVersion,
    ) -> Result<Option<PolicyVersionRecord>, GateError> {
        let row = sqlx::query(
            "SELECT policy_id, version, spec, hash, published_at, published_by
             FROM policy_version_records WHERE policy_id = $1 AND version = $2",
        )
        .bind(policy_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref().map(row_to_version_record).transpose()
    }
}

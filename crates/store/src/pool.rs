//! Connection pool setup and migration runner.

use crate::error::map_sqlx_err;
use gate_core::GateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to `database_url` and applies every migration in
/// `store/migrations/` that has not yet run.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, GateError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(map_sqlx_err)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| GateError::DatabaseUnavailable {
            reason: e.to_string(),
        })?;

    Ok(pool)
}

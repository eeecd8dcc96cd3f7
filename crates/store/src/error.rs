//! Maps `sqlx` failures onto the shared [`gate_core::GateError`] taxonomy.
//! Every storage failure becomes `DatabaseUnavailable` or `Internal`; callers
//! never see a raw `sqlx::Error`, keeping the fail-closed contract at the
//! crate boundary (spec §7).

use gate_core::GateError;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> GateError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            GateError::DatabaseUnavailable {
                reason: err.to_string(),
            }
        }
        other => GateError::Internal {
            reason: other.to_string(),
        },
    }
}

//! Pure helpers for `gate-cli`, split out of `main` so they can be exercised
//! without a running registry.

use serde_json::Value;

/// Checks a fetched session body's `env_id` against the `env` the operator
/// asked for. Returns a warning message when they don't match; `session
/// show`'s only lookup key is the session id, so this is a client-side
/// sanity check, not an enforced filter.
pub fn env_mismatch_warning(body: &Value, expected_env: &str, session_id: &str) -> Option<String> {
    let found_env = body.get("env_id")?.as_str()?;
    if found_env == expected_env {
        None
    } else {
        Some(format!(
            "warning: session {session_id} belongs to env '{found_env}', not '{expected_env}'"
        ))
    }
}

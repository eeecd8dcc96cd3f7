//! Request-shape helpers for the admin surface, split out of `main` so they
//! can be exercised without a database.

/// A policy `name` must be non-empty and reasonably short; everything else
/// about the policy (its `spec`) is validated by `policy_engine::validate_policy`
/// once it reaches `PolicyStore`.
pub fn validate_policy_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > 256 {
        return Err("name must be at most 256 characters".to_string());
    }
    Ok(())
}

/// Parses a `:version` path segment into a [`gate_core::PolicyVersion`].
/// Path extractors already give us a typed `i64` in the common case; this
/// exists for the query-string form (`?version=`) where axum hands back a
/// string.
pub fn parse_version(raw: &str) -> Result<gate_core::PolicyVersion, String> {
    raw.parse::<gate_core::PolicyVersion>()
        .map_err(|_| format!("'{raw}' is not a valid policy version"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_policy_name("   ").is_err());
    }

    #[test]
    fn accepts_reasonable_name() {
        assert!(validate_policy_name("refund-flow").is_ok());
    }

    #[test]
    fn parses_a_well_formed_version() {
        assert_eq!(parse_version("3").unwrap(), 3);
    }

    #[test]
    fn rejects_a_non_numeric_version() {
        assert!(parse_version("latest").is_err());
    }
}

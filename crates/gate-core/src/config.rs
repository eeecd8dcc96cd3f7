//! Runtime configuration (spec §6 Configuration). Parsed once at startup in
//! each service's `main.rs`; there is no runtime reload.

use crate::defaults;

/// Options recognized by every service in this workspace. Fields map
/// directly onto the named environment variables in §6.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub database_url: String,
    pub max_payload_bytes: usize,
    pub rate_limit_requests_per_minute: u32,
    pub max_history_length: usize,
    pub api_key_prefix_length: usize,
    pub api_key_min_length: usize,
    pub request_deadline_ms: u64,
    pub bind_addr: String,
}

impl GateConfig {
    /// Reads recognized environment variables, falling back to
    /// `crate::defaults` for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DB_DSN").unwrap_or_default(),
            max_payload_bytes: parse_env("MAX_PAYLOAD_BYTES", defaults::MAX_PAYLOAD_BYTES),
            rate_limit_requests_per_minute: parse_env(
                "RATE_LIMIT_REQUESTS_PER_MINUTE",
                defaults::RATE_LIMIT_REQUESTS_PER_MINUTE,
            ),
            max_history_length: parse_env("MAX_HISTORY_LENGTH", defaults::MAX_HISTORY_LENGTH),
            api_key_prefix_length: parse_env(
                "API_KEY_PREFIX_LENGTH",
                defaults::API_KEY_PREFIX_LENGTH,
            ),
            api_key_min_length: parse_env("API_KEY_MIN_LENGTH", defaults::API_KEY_MIN_LENGTH),
            request_deadline_ms: parse_env("REQUEST_DEADLINE_MS", defaults::REQUEST_DEADLINE_MS),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_payload_bytes: defaults::MAX_PAYLOAD_BYTES,
            rate_limit_requests_per_minute: defaults::RATE_LIMIT_REQUESTS_PER_MINUTE,
            max_history_length: defaults::MAX_HISTORY_LENGTH,
            api_key_prefix_length: defaults::API_KEY_PREFIX_LENGTH,
            api_key_min_length: defaults::API_KEY_MIN_LENGTH,
            request_deadline_ms: defaults::REQUEST_DEADLINE_MS,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_crate_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.max_payload_bytes, defaults::MAX_PAYLOAD_BYTES);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}

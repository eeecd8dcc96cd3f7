//! Constant-time API key validation (C5, spec §4.5 points 1-4).

use gate_core::{ApiKey, GateError};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::instrument;

/// A presented credential split into its lookup prefix and full secret.
#[derive(Debug, Clone, Copy)]
pub struct PresentedKey<'a> {
    pub prefix: &'a str,
    pub full: &'a str,
}

impl<'a> PresentedKey<'a> {
    /// Split a presented secret into `(prefix, full)`. Returns `None` if the
    /// header is absent or shorter than `min_length` (§4.5 point 1).
    #[must_use]
    pub fn parse(presented: &'a str, prefix_length: usize, min_length: usize) -> Option<Self> {
        if presented.len() < min_length || presented.len() < prefix_length {
            return None;
        }
        Some(Self {
            prefix: &presented[..prefix_length],
            full: presented,
        })
    }
}

/// Validates a presented key against a bounded set of candidate rows sharing
/// its prefix. The caller is responsible for the candidate lookup (`store`);
/// this type only does the constant-time comparison and revocation check.
#[derive(Debug, Default)]
pub struct ApiKeyGate;

impl ApiKeyGate {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compare `presented` against every `candidate`, every time, regardless
    /// of length or an early match — a non-matching length must still
    /// perform equal work to avoid a timing side channel (§4.5 point 3).
    #[instrument(skip(self, presented, candidates), fields(candidate_count = candidates.len()))]
    pub fn authenticate(
        &self,
        presented: &str,
        candidates: &[ApiKey],
    ) -> Result<ApiKey, GateError> {
        let presented_hash = Sha256::digest(presented.as_bytes());

        let mut matched: Option<&ApiKey> = None;
        for candidate in candidates {
            let stored_hash = decode_hex_digest(&candidate.key_hash);
            let equal = match &stored_hash {
                Some(stored) => bool::from(presented_hash.as_slice().ct_eq(stored)),
                None => false,
            };
            // Evaluate every candidate unconditionally; do not short-circuit
            // once `matched` is set, so the loop's running time does not
            // depend on which candidate (if any) matches.
            if equal && matched.is_none() {
                matched = Some(candidate);
            }
        }

        match matched {
            None => Err(GateError::InvalidApiKey),
            Some(key) if key.is_revoked() => Err(GateError::ApiKeyRevoked),
            Some(key) => Ok(key.clone()),
        }
    }
}

fn decode_hex_digest(hex: &str) -> Option<[u8; 32]> {
    if hex.len() != 64 {
        return None;
    }
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// Hash a raw secret the same way stored `keyHash` values are produced, for
/// use by the registry when minting new keys.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn key(secret: &str, revoked: bool) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            env_id: "env-1".to_string(),
            key_prefix: secret[..8].to_string(),
            key_hash: hash_secret(secret),
            revoked_at: if revoked { Some(Utc::now()) } else { None },
        }
    }

    #[test]
    fn matching_key_authenticates() {
        let gate = ApiKeyGate::new();
        let secret = "abcdef01deadbeefdeadbeefdeadbeef";
        let candidates = vec![key(secret, false)];
        let result = gate.authenticate(secret, &candidates).unwrap();
        assert_eq!(result.key_hash, hash_secret(secret));
    }

    #[test]
    fn non_matching_key_is_rejected() {
        let gate = ApiKeyGate::new();
        let candidates = vec![key("abcdef01deadbeefdeadbeefdeadbeef", false)];
        let err = gate.authenticate("wrong-secret-wrong-secret", &candidates).unwrap_err();
        assert!(matches!(err, GateError::InvalidApiKey));
    }

    #[test]
    fn revoked_key_is_rejected_even_on_hash_match() {
        let gate = ApiKeyGate::new();
        let secret = "abcdef01deadbeefdeadbeefdeadbeef";
        let candidates = vec![key(secret, true)];
        let err = gate.authenticate(secret, &candidates).unwrap_err();
        assert!(matches!(err, GateError::ApiKeyRevoked));
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        let gate = ApiKeyGate::new();
        let err = gate.authenticate("anything", &[]).unwrap_err();
        assert!(matches!(err, GateError::InvalidApiKey));
    }

    #[test]
    fn parse_rejects_short_presented_secrets() {
        assert!(PresentedKey::parse("short", 8, 24).is_none());
    }

    #[test]
    fn parse_splits_prefix_from_full_secret() {
        let presented = "abcdef01deadbeefdeadbeefdeadbeef";
        let parsed = PresentedKey::parse(presented, 8, 24).unwrap();
        assert_eq!(parsed.prefix, "abcdef01");
        assert_eq!(parsed.full, presented);
    }
}

/*
 * Responsibility
 * - jsonwebtoken-backed TokenVerifier (EdDSA / Ed25519 public key)
 * - `validate` does full signature + iss/aud/exp verification;
 *   `decode_claims` only re-reads the payload of an accepted token
 */
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::warn;

use crate::config::ConfigError;
use crate::services::auth::{ClaimSet, TokenVerifier};

/// EdDSA (Ed25519) access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    decode_only: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    /// `public_key_pem` must be an Ed25519 public key in PEM format.
    pub fn new(
        public_key_pem: &str,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, ConfigError> {
        let decoding_key = DecodingKey::from_ed_pem(public_key_pem.as_bytes()).map_err(|e| {
            warn!(error = %e, "failed to parse access JWT public key PEM (expected Ed25519 PEM)");
            ConfigError::Invalid("ACCESS_JWT_PUBLIC_KEY_PEM")
        })?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway_seconds;

        // Payload re-read for tokens `validate` already accepted.
        let mut decode_only = Validation::new(Algorithm::EdDSA);
        decode_only.insecure_disable_signature_validation();
        decode_only.validate_exp = false;
        decode_only.validate_aud = false;
        decode_only.required_spec_claims.clear();

        Ok(Self {
            decoding_key,
            validation,
            decode_only,
        })
    }
}

impl TokenVerifier for JwtVerifier {
    fn validate(&self, token: &str) -> bool {
        match jsonwebtoken::decode::<serde_json::Map<String, Value>>(
            token,
            &self.decoding_key,
            &self.validation,
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "jwt verification failed");
                false
            }
        }
    }

    fn decode_claims(&self, token: &str) -> Option<ClaimSet> {
        let data = jsonwebtoken::decode::<serde_json::Map<String, Value>>(
            token,
            &self.decoding_key,
            &self.decode_only,
        )
        .ok()?;
        claims_from_map(data.claims)
    }
}

fn claims_from_map(raw: serde_json::Map<String, Value>) -> Option<ClaimSet> {
    let sub = raw.get("sub")?.as_str()?.trim();
    if sub.is_empty() {
        return None;
    }
    let sub = sub.to_string();

    let email = raw
        .get("email")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    // `roles` may be a single string or an array of strings
    let roles = match raw.get("roles") {
        Some(Value::String(role)) => vec![role.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        _ => Vec::new(),
    };

    Some(ClaimSet {
        sub,
        email,
        roles,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn claims_require_a_non_empty_subject() {
        assert!(claims_from_map(map(json!({"email": "a@b.c"}))).is_none());
        assert!(claims_from_map(map(json!({"sub": "  "}))).is_none());
        assert!(claims_from_map(map(json!({"sub": "abc"}))).is_some());
    }

    #[test]
    fn roles_accept_string_or_array() {
        let single = claims_from_map(map(json!({"sub": "u", "roles": "admin"}))).unwrap();
        assert_eq!(single.roles, vec!["admin"]);

        let many =
            claims_from_map(map(json!({"sub": "u", "roles": ["admin", "user"]}))).unwrap();
        assert_eq!(many.roles, vec!["admin", "user"]);

        let none = claims_from_map(map(json!({"sub": "u"}))).unwrap();
        assert!(none.roles.is_empty());
    }

    #[test]
    fn raw_claim_map_is_preserved() {
        let claims =
            claims_from_map(map(json!({"sub": "u", "email": "a@b.c", "custom": 42}))).unwrap();
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
        assert_eq!(claims.raw.get("custom"), Some(&json!(42)));
    }
}

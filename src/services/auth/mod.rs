/*
 * Responsibility
 * - TokenVerifier: the narrow contract the auth gate talks to
 * - ClaimSet: claims handed back to the gate after validation
 * - Token issuance (signing, refresh storage) lives outside this service
 */
mod jwt;

pub use jwt::JwtVerifier;

/// Claims extracted from a token the verifier has already accepted.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    pub sub: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// Stateless token verification. Safe for unbounded concurrent calls.
///
/// `decode_claims` may skip signature re-verification: it is only ever
/// called for tokens `validate` accepted.
pub trait TokenVerifier: Send + Sync {
    fn validate(&self, token: &str) -> bool;
    fn decode_claims(&self, token: &str) -> Option<ClaimSet>;
}

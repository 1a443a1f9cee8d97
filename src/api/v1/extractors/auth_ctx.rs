/*
 * Responsibility
 * - The authenticated-principal type handlers receive
 * - The auth gate validates the token and stores this in request extensions;
 *   handlers only ever see this type, never the token
 */
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Resolved identity of an authenticated request.
///
/// Owned by the request; dropped when handling ends.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    /// Raw claim mapping as decoded from the accepted token.
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl AuthCtx {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl<S> FromRequestParts<S> for AuthCtx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Missing authentication context"))
    }
}

/*
 * Responsibility
 * - Bearer-token gate for everything outside the public allow-list
 * - Extract token (Authorization header; `?token=` only when opted in),
 *   validate via the TokenVerifier, decode claims, attach AuthCtx to
 *   request extensions for handlers
 * - Terminates the chain itself on any auth failure; never re-raises.
 *   Rejections use the same ErrorResponse shape as every other failure.
 */
use axum::{
    extract::{Request, State},
    http::{Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_ascii_lowercase();

    if path == "/"
        || state
            .config
            .auth
            .public_paths
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    {
        return next.run(req).await;
    }

    let token = match bearer_token(&req) {
        Some(t) => t,
        None if state.config.auth.allow_query_token => match query_token(req.uri()) {
            Some(t) => t,
            None => return reject(&path, "Missing authentication token"),
        },
        None => return reject(&path, "Missing authentication token"),
    };

    if !state.verifier.validate(&token) {
        tracing::warn!(path = %path, "access token verification failed");
        return reject(&path, "Invalid or expired token");
    }

    // Signature already checked above; decoding trusts the validator.
    let Some(claims) = state.verifier.decode_claims(&token) else {
        tracing::warn!(path = %path, "token accepted but claims could not be decoded");
        return reject(&path, "Invalid token claims");
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        tracing::warn!(path = %path, sub = %claims.sub, "subject claim is not a UUID");
        return reject(&path, "Invalid token claims");
    };

    let auth_ctx = AuthCtx {
        user_id,
        email: claims.email.unwrap_or_default(),
        roles: claims.roles,
        claims: claims.raw,
    };
    req.extensions_mut().insert(auth_ctx);

    next.run(req).await
}

fn reject(path: &str, message: &str) -> Response {
    tracing::warn!(path = %path, message, "request rejected by auth gate");
    AppError::unauthorized(message).into_response()
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn query_token(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_the_scheme_prefix() {
        let req = Request::builder()
            .header("authorization", "Bearer abc.def.ghi")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwdw==")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn query_token_is_read_from_the_token_parameter() {
        let uri: Uri = "/api/v1/users?page=2&token=abc%20def".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("abc def"));

        let uri: Uri = "/api/v1/users?page=2".parse().unwrap();
        assert_eq!(query_token(&uri), None);
    }
}

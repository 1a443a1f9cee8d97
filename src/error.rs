/*
 * Responsibility
 * - App-wide AppError taxonomy (closed set, each variant bound to one status code)
 * - The single ErrorResponse wire shape used by every rejecting component
 *   (handlers, auth gate, error mapper) — no ad hoc error bodies anywhere
 * - IntoResponse carries the typed error to the outermost mapper via
 *   response extensions; the mapper renders the canonical body
 */
use std::collections::BTreeMap;
use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppEnv;
use crate::repos::user_repo::StoreError;

/// Per-request correlation token. Generated once by the outermost middleware,
/// immutable afterwards; echoed in the `x-request-id` header and in every
/// error body so clients can cite it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Field name -> list of validation messages.
pub type ValidationDetails = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: ValidationDetails,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadArgument(String),
    #[error("{0}")]
    InvalidState(String),
    // Anything unclassified. `source_desc` is only ever disclosed outside
    // production.
    #[error("an unexpected error occurred")]
    Internal { source_desc: Option<String> },
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: ValidationDetails) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn internal(source_desc: impl Into<String>) -> Self {
        Self::Internal {
            source_desc: Some(source_desc.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadArgument(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable category label clients can switch on.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Validation failed",
            Self::NotFound(_) => "Resource not found",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Conflict(_) => "Conflict",
            Self::BadArgument(_) => "Invalid argument",
            Self::InvalidState(_) => "Invalid operation state",
            Self::Internal { .. } => "Internal server error",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail(email) => {
                Self::conflict(format!("a user with email '{email}' already exists"))
            }
            StoreError::Unavailable(detail) => {
                Self::invalid_state(format!("user store unavailable: {detail}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Minimal marker response. The error mapper (outermost middleware)
    /// reads the extension back out and replaces the whole response with the
    /// canonical ErrorResponse body; this body only survives if the mapper
    /// is not installed (unit tests, or a started stream it must not touch).
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.category(),
            "message": self.to_string(),
        });
        let mut resp = (status, Json(body)).into_response();
        resp.extensions_mut().insert(self);
        resp
    }
}

/// The one wire contract for failures. camelCase on the wire; pretty-printed
/// only outside production.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub method: String,
}

impl ErrorResponse {
    pub fn from_error(
        err: &AppError,
        trace_id: TraceId,
        path: &str,
        method: &str,
        app_env: AppEnv,
    ) -> Self {
        let details = match err {
            AppError::Validation { details, .. } if !details.is_empty() => Some(details.clone()),
            _ => None,
        };

        // Internal details leak only outside production.
        let (stack_trace, source) = if app_env.is_production() {
            (None, None)
        } else {
            match err {
                AppError::Internal { source_desc } => (
                    Some(std::backtrace::Backtrace::force_capture().to_string()),
                    source_desc.clone(),
                ),
                _ => (None, None),
            }
        };

        Self {
            error: err.category(),
            message: err.to_string(),
            details,
            stack_trace,
            source,
            trace_id: trace_id.to_string(),
            timestamp: Utc::now(),
            path: path.to_string(),
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (AppError::validation("v", ValidationDetails::new()), 400),
            (AppError::not_found("n"), 404),
            (AppError::unauthorized("u"), 401),
            (AppError::conflict("c"), 409),
            (AppError::bad_argument("b"), 400),
            (AppError::invalid_state("i"), 400),
            (AppError::internal("boom"), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code, "{err}");
        }
    }

    #[test]
    fn wire_shape_is_camel_case_with_optional_fields_omitted() {
        let err = AppError::not_found("User with ID 999 not found");
        let body = ErrorResponse::from_error(
            &err,
            TraceId::new(),
            "/api/v1/users/999",
            "GET",
            AppEnv::Production,
        );
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "Resource not found");
        assert_eq!(json["message"], "User with ID 999 not found");
        assert_eq!(json["path"], "/api/v1/users/999");
        assert_eq!(json["method"], "GET");
        assert!(json.get("details").is_none());
        assert!(json.get("stackTrace").is_none());
        assert!(json.get("source").is_none());
        assert!(json["traceId"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn internal_details_only_outside_production() {
        let err = AppError::internal("db connection refused");

        let dev = ErrorResponse::from_error(&err, TraceId::new(), "/", "GET", AppEnv::Development);
        assert_eq!(dev.source.as_deref(), Some("db connection refused"));
        assert!(dev.stack_trace.is_some());

        let prod = ErrorResponse::from_error(&err, TraceId::new(), "/", "GET", AppEnv::Production);
        assert!(prod.source.is_none());
        assert!(prod.stack_trace.is_none());
    }

    #[test]
    fn validation_details_are_carried() {
        let mut details = ValidationDetails::new();
        details.insert("email".into(), vec!["must contain '@'".into()]);
        let err = AppError::validation("validation failed", details);
        let body =
            ErrorResponse::from_error(&err, TraceId::new(), "/", "POST", AppEnv::Production);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"]["email"][0], "must contain '@'");
    }
}

/*
 * Responsibility
 * - Terminal wrapper: generates the per-request TraceId, runs the whole
 *   inner chain, converts any failure into the one canonical ErrorResponse
 *   body (status from the taxonomy table)
 * - Failures that never became an AppError (extractor rejections, unknown
 *   routes, transport limits) are classified from their status code so no
 *   error leaves without the canonical shape
 * - Never writes over a response that already started streaming
 * - A failed error-write never propagates; worst case is a static fallback
 */
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AppEnv;
use crate::error::{AppError, ErrorResponse, TraceId};
use crate::middleware::capture::ResponseStarted;
use crate::state::AppState;

pub const TRACE_ID_HEADER: &str = "x-request-id";

const FALLBACK_BODY: &str =
    r#"{"error":"Internal server error","message":"an unexpected error occurred"}"#;

pub async fn map_errors(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let trace_id = TraceId::new();
    req.extensions_mut().insert(trace_id);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut resp = next.run(req).await;
    let status = resp.status();

    let typed = resp.extensions().get::<AppError>().cloned();
    if typed.is_none() && !(status.is_client_error() || status.is_server_error()) {
        echo_trace_id(&mut resp, trace_id);
        return resp;
    }

    // Bytes already on the wire cannot be un-sent; rewriting the body now
    // would corrupt what the client received. Log and leave it alone.
    if resp.extensions().get::<ResponseStarted>().is_some() {
        tracing::warn!(
            method = %method,
            path = %path,
            trace_id = %trace_id,
            "response already started, cannot write error body"
        );
        return resp;
    }

    let err = match typed {
        Some(err) => err,
        None => classify_untyped(status, drain_detail(resp).await),
    };

    tracing::error!(
        method = %method,
        path = %path,
        trace_id = %trace_id,
        status = status.as_u16(),
        error = %err,
        "request failed"
    );

    let mut out = render(&err, trace_id, &path, method.as_str(), state.config.app_env);
    // keep the original status for codes outside the taxonomy table (405, 413, ...)
    *out.status_mut() = status;
    echo_trace_id(&mut out, trace_id);
    out
}

/// Pull whatever detail text the rejecting layer wrote (axum extractor
/// rejections are plain text) so it survives as the message.
async fn drain_detail(resp: Response) -> Option<String> {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.ok()?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Bind an untyped failure to the taxonomy by its status code; anything
/// without a matching category is unclassified.
fn classify_untyped(status: StatusCode, detail: Option<String>) -> AppError {
    let message = detail
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::bad_argument(message)
        }
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::UNAUTHORIZED => AppError::unauthorized(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        _ => AppError::internal(message),
    }
}

fn render(err: &AppError, trace_id: TraceId, path: &str, method: &str, env: AppEnv) -> Response {
    let body = ErrorResponse::from_error(err, trace_id, path, method, env);

    let json = if env.is_production() {
        serde_json::to_string(&body)
    } else {
        serde_json::to_string_pretty(&body)
    };

    let json = match json {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, error = %e, "failed to serialize error response");
            FALLBACK_BODY.to_string()
        }
    };

    let mut resp = Response::new(Body::from(json));
    *resp.status_mut() = err.status_code();
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn echo_trace_id(resp: &mut Response, trace_id: TraceId) {
    if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
        resp.headers_mut().insert(TRACE_ID_HEADER, value);
    }
}

/// Handler panics surface here as the one genuinely unclassifiable failure;
/// they go through the same taxonomy path as everything else.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder;

impl tower_http::catch_panic::ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn std::any::Any + Send + 'static>,
    ) -> axum::http::Response<Body> {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "panic with non-string payload".to_string()
        };
        tracing::error!(detail = %detail, "handler panicked");

        AppError::internal(detail).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_failures_bind_to_the_matching_category() {
        let err = classify_untyped(StatusCode::BAD_REQUEST, Some("bad json".into()));
        assert!(matches!(err, AppError::BadArgument(_)));
        assert_eq!(err.to_string(), "bad json");

        let err = classify_untyped(StatusCode::NOT_FOUND, None);
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Not Found");

        assert!(matches!(
            classify_untyped(StatusCode::UNAUTHORIZED, None),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_untyped(StatusCode::CONFLICT, None),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn unmatched_statuses_are_unclassified() {
        assert!(matches!(
            classify_untyped(StatusCode::METHOD_NOT_ALLOWED, None),
            AppError::Internal { .. }
        ));
        assert!(matches!(
            classify_untyped(StatusCode::PAYLOAD_TOO_LARGE, None),
            AppError::Internal { .. }
        ));
    }
}

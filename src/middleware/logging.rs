/*
 * Responsibility
 * - HTTP access logging: one "incoming" and one "outgoing" event per request
 * - Orchestrates capture (body buffering/replay) + filter (exclusions,
 *   header redaction) per LoggingOptions
 * - Observes only: failures pass through unchanged, bodies are replayed
 *   byte-identical to handler and client
 * - Once engaged, the outgoing event is emitted on every exit path, even
 *   when the interceptor itself fails to read a body
 */
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::Level;

use crate::error::AppError;
use crate::middleware::{capture, filter};
use crate::state::AppState;

/// Target for the two access-log events; lets deployments route or silence
/// them independently of the rest of the crate's tracing output.
pub const LOG_TARGET: &str = "http_log";

/// Outgoing-event severity is a pure function of the status code.
pub fn severity(status: u16) -> Level {
    if status >= 500 {
        Level::ERROR
    } else if status >= 400 {
        Level::WARN
    } else {
        Level::INFO
    }
}

pub async fn http_log(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let opts = &state.config.logging;

    // Excluded paths bypass the interceptor entirely: no events, no timer.
    if filter::is_excluded_path(req.uri().path(), &opts.exclude_paths) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = opts.log_duration.then(Instant::now);

    let client_ip = opts.log_client_ip.then(|| client_ip(&req));
    let req_headers = opts
        .log_headers
        .then(|| filter::filter_headers(req.headers(), &opts.exclude_headers));

    let (req, req_body) = if opts.log_request_body && declares_body(&req) {
        match capture::buffer_request(req, opts.max_body_size).await {
            Ok((req, text)) => (req, (!text.is_empty()).then_some(text)),
            Err(err) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    error = %err,
                    "failed to read request body"
                );
                let resp = AppError::internal(format!("failed to read request body: {err}"))
                    .into_response();
                emit_outgoing(
                    &method,
                    &path,
                    resp.status().as_u16(),
                    started.map(|t| t.elapsed().as_millis() as u64),
                    None,
                    None,
                );
                return resp;
            }
        }
    } else {
        (req, None)
    };

    tracing::info!(
        target: LOG_TARGET,
        method = %method,
        path = %path,
        client_ip = client_ip.as_deref(),
        headers = req_headers.as_deref(),
        body = req_body.as_deref(),
        "incoming request"
    );

    let resp = next.run(req).await;

    // Always runs, success or failure: stop the timer, drain + replay the
    // response body when enabled, emit exactly one outgoing event.
    let resp_headers = opts
        .log_response_headers
        .then(|| filter::filter_headers(resp.headers(), &opts.exclude_headers));

    let (resp, resp_body) = if opts.log_response_body {
        match capture::buffer_response(resp, opts.max_body_size).await {
            Ok((resp, text)) => (resp, (!text.is_empty()).then_some(text)),
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    method = %method,
                    path = %path,
                    error = %err,
                    "failed to read response body"
                );
                (
                    AppError::internal(format!("failed to read response body: {err}"))
                        .into_response(),
                    None,
                )
            }
        }
    } else {
        (resp, None)
    };

    emit_outgoing(
        &method,
        &path,
        resp.status().as_u16(),
        started.map(|t| t.elapsed().as_millis() as u64),
        resp_headers.as_deref(),
        resp_body.as_deref(),
    );

    resp
}

fn emit_outgoing(
    method: &Method,
    path: &str,
    status: u16,
    elapsed_ms: Option<u64>,
    headers: Option<&str>,
    body: Option<&str>,
) {
    let level = severity(status);
    if level == Level::ERROR {
        tracing::error!(
            target: LOG_TARGET,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            headers,
            body,
            "outgoing response"
        );
    } else if level == Level::WARN {
        tracing::warn!(
            target: LOG_TARGET,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            headers,
            body,
            "outgoing response"
        );
    } else {
        tracing::info!(
            target: LOG_TARGET,
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            headers,
            body,
            "outgoing response"
        );
    }
}

fn declares_body(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_a_pure_function_of_status() {
        assert_eq!(severity(500), Level::ERROR);
        assert_eq!(severity(503), Level::ERROR);
        assert_eq!(severity(400), Level::WARN);
        assert_eq!(severity(404), Level::WARN);
        assert_eq!(severity(499), Level::WARN);
        assert_eq!(severity(200), Level::INFO);
        assert_eq!(severity(204), Level::INFO);
        assert_eq!(severity(302), Level::INFO);
        assert_eq!(severity(399), Level::INFO);
    }
}

/*
 * Responsibility
 * - Transport-level middleware applied to every route, regardless of API
 *   version: body size limit, global timeout, panic containment, CORS,
 *   TraceLayer spans
 * - Sits between the error mapper (outside) and the access log (inside)
 */
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::error_mapper::PanicResponder;

/// Apply the transport middleware to the given Router.
///
/// Defaults:
/// - Body limit: 1 MiB
/// - Timeout: 30 seconds
pub fn apply<S>(router: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let layers = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into
        // typed failures for the mapper above us.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            handle_transport_error(err)
        }))
        .layer(CatchPanicLayer::custom(PanicResponder))
        // Limit request body size (protects against accidental/hostile large payloads).
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        // Bound request time (protects against hanging upstreams / slow clients).
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http());

    router.layer(layers).layer(cors(config))
}

/// Nothing below the handlers can classify a transport failure; timeouts
/// and other infrastructure errors are unclassified 500s.
fn handle_transport_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::internal("request timed out")
    } else {
        AppError::internal(err.to_string())
    }
}

/// CORS policy.
///
/// - Development: permissive (Allow-Origin: *), without credentials.
/// - Production: allowlist origins from Config; an empty allowlist allows
///   none, which is safer than accidentally allowing all.
fn cors(config: &Config) -> CorsLayer {
    let cors = if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
            allowed.iter().any(|v| v == origin)
        });

        CorsLayer::new().allow_origin(allow_origin)
    } else {
        CorsLayer::new().allow_origin(Any)
    };

    cors.allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers([
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        HeaderName::from_static("x-request-id"),
    ])
    .max_age(Duration::from_secs(60 * 10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::timeout::error::Elapsed;

    #[test]
    fn timeouts_are_unclassified_server_errors() {
        let err = handle_transport_error(Box::new(Elapsed::new()));
        assert!(matches!(err, AppError::Internal { .. }));
        assert_eq!(err.status_code().as_u16(), 500);
    }
}

/*
 * Responsibility
 * - Config load -> dependency wiring -> Router assembly
 * - Middleware chain ordering (error mapper outermost, then transport,
 *   access log, auth gate, handlers)
 * - axum::serve() startup
 */
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Json, Router, middleware::from_fn_with_state, routing::get};
use serde_json::json;

use crate::{
    api,
    config::Config,
    middleware::{auth::access, error_mapper, http, logging},
    repos::user_repo::InMemoryUserStore,
    services::auth::JwtVerifier,
    state::AppState,
};

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;

    let verifier = JwtVerifier::new(
        &config.auth.public_key_pem,
        &config.auth.issuer,
        &config.auth.audience,
        config.auth.leeway_seconds,
    )?;

    let state = AppState::new(
        config,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(verifier),
    );
    let addr = state.config.addr;

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Assemble the full router with the interception pipeline applied.
///
/// Layer order (outermost first): error mapper, transport stack
/// (limits/timeout/panics/CORS), access log, auth gate, handlers.
/// axum applies `.layer()` inside-out, so they appear here in reverse.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .nest("/api/v1", api::v1::routes())
        .layer(from_fn_with_state(state.clone(), access::require_auth))
        .layer(from_fn_with_state(state.clone(), logging::http_log));

    let router = http::apply(router, &state.config);

    router
        .layer(from_fn_with_state(state.clone(), error_mapper::map_errors))
        .with_state(state)
}

// Public root; also the smoke-test target for the auth bypass.
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "users-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

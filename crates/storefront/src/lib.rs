//! Music Shop storefront library.
//!
//! The binary in `main.rs` wires these modules into a server; the CLI and
//! the integration tests use the services and stores directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Build the full application router.
///
/// Static files are served from `static_dir`.
pub fn app(state: AppState, static_dir: &std::path::Path) -> Router {
    let session_layer = middleware::create_session_layer(state.store(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness: the process is up.
async fn health() -> &'static str {
    "ok"
}

/// Readiness: the database answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

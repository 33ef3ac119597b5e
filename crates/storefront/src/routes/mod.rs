//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Mini-app API
//! POST /api/bootstrap          - Session, menu, and the user's orders
//! POST /api/whoami             - Verified identity
//! GET  /api/menu               - Stored catalog, re-read from disk
//! GET  /api/orders             - Last 20 orders, newest first
//! POST /api/orders             - Checkout
//!
//! # Diagnostics
//! GET  /api/debug/pos-raw      - Raw nomenclature summary from the POS system
//! POST /api/debug/menu-sync    - Run a catalog sync now
//! GET  /api/debug/relay-failures - Recent POS relay failures
//!
//! # Static
//! GET  /*                      - Mini-app bundle from `STATIC_DIR`
//! ```

pub mod debug;
pub mod menu;
pub mod orders;
pub mod session;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the diagnostics routes router.
pub fn debug_routes() -> Router<AppState> {
    Router::new()
        .route("/pos-raw", get(debug::pos_raw))
        .route("/menu-sync", post(debug::menu_sync))
        .route("/relay-failures", get(debug::relay_failures))
}

/// Create the mini-app API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/bootstrap", post(session::bootstrap))
        .route("/whoami", post(session::whoami))
        .route("/menu", get(menu::show))
        .route("/orders", get(orders::recent).post(orders::create))
        .nest("/debug", debug_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
}

/// Build the complete application: routes, static files, and middleware.
///
/// Sentry layers are added by the binary, outside of this.
pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config().static_dir);

    routes()
        .fallback_service(static_files)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the POS system.
async fn health() -> &'static str {
    "ok"
}

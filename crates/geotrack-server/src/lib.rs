//! HTTP adapter for the geotrack telemetry store.
//!
//! Translates HTTP requests into [`TelemetryStore`] calls and exposes the
//! health-check and metrics surfaces. The store is an injected capability;
//! this crate owns only routing, middleware, and the expiration sweeper.

pub mod expire;
pub mod handlers;
pub mod metrics;
pub mod middleware;

use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;

use geotrack_core::TelemetryStore;

use crate::metrics::HttpMetrics;

/// Shared server state.
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
    pub registry: Registry,
    pub http_metrics: HttpMetrics,
}

/// Build the axum router.
///
/// Middleware runs outermost-first: request metrics, request id, request
/// logging, CORS, security headers, then the handler.
pub fn build_router(store: Arc<dyn TelemetryStore>, registry: Registry) -> Router {
    let http_metrics = HttpMetrics::new(&registry);
    let state = Arc::new(AppState {
        store,
        registry,
        http_metrics,
    });

    Router::new()
        .route("/metrics", get(handlers::metrics_exposition))
        .route("/health/liveness", get(handlers::liveness))
        .route("/health/readiness", get(handlers::readiness))
        .route(
            "/api/v1/location",
            get(handlers::get_all_locations).post(handlers::update_location),
        )
        .route("/api/v1/location/{id}", get(handlers::get_location))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::cors))
        .layer(from_fn(middleware::log_requests))
        .layer(from_fn(middleware::request_id))
        .layer(from_fn_with_state(state.clone(), middleware::track_metrics))
        .with_state(state)
}

/// Serve the API on `addr` until the shutdown token fires.
pub async fn run_server(
    store: Arc<dyn TelemetryStore>,
    registry: Registry,
    addr: &str,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = build_router(store, registry);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("http server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

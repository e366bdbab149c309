//! Request handlers: location read/write, the health-check surface, and the
//! Prometheus exposition endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use prometheus::TextEncoder;
use serde::Serialize;

use geotrack_core::{StoreError, Telemetry};

use crate::AppState;

/// Uniform error body for every failure path.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
    pub message: String,
}

/// Body returned for a successful location report.
#[derive(Debug, Serialize)]
pub struct CreatedBody {
    pub message: String,
    pub id: String,
}

/// Response status for a classified store error.
fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NoRecord => StatusCode::NOT_FOUND,
        StoreError::Decode(_) | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::Unavailable(_) | StoreError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn render_error(status: StatusCode, err: &StoreError) -> Response {
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            status: status.as_u16(),
            message: "an error has occurred".to_string(),
        }),
    )
        .into_response()
}

/// `GET /api/v1/location/{id}`
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get(&id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => render_error(status_for(&err), &err),
    }
}

/// `GET /api/v1/location` — every known object; an empty store is an empty
/// array, never an error.
pub async fn get_all_locations(State(state): State<Arc<AppState>>) -> Response {
    let locations = state.store.get_all();
    (StatusCode::OK, Json(locations)).into_response()
}

/// `POST /api/v1/location` — parse, validate, upsert.
///
/// The raw body goes through [`Telemetry::parse_and_validate`] so decode and
/// validation failures are classified before the store is ever touched.
pub async fn update_location(State(state): State<Arc<AppState>>, body: String) -> Response {
    let record = match Telemetry::parse_and_validate(&body) {
        Ok(record) => record,
        Err(err) => return render_error(status_for(&err), &err),
    };

    match state.store.upsert(record) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(CreatedBody {
                message: "created".to_string(),
                id,
            }),
        )
            .into_response(),
        Err(err) => render_error(StatusCode::INTERNAL_SERVER_ERROR, &err),
    }
}

/// `GET /health/liveness`
pub async fn liveness(State(state): State<Arc<AppState>>) -> Response {
    match state.store.alive() {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => render_error(StatusCode::SERVICE_UNAVAILABLE, &err),
    }
}

/// `GET /health/readiness`
pub async fn readiness(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ready() {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => render_error(StatusCode::SERVICE_UNAVAILABLE, &err),
    }
}

/// `GET /metrics` — text exposition of the injected registry.
pub async fn metrics_exposition(State(state): State<Arc<AppState>>) -> Response {
    match TextEncoder::new().encode_to_string(&state.registry.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            log::error!("metrics exposition failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

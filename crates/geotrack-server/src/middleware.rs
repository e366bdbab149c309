//! Middleware stack: request ids, request logging, HTTP metrics, CORS, and
//! security headers.
//!
//! Everything here is composed from axum primitives via
//! [`axum::middleware::from_fn`]; the handlers below never see any of it.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::AppState;

/// Request id assigned per inbound request, readable from request extensions
/// and echoed on the response as `X-Request-Id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Type, X-CSRF-Token";

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Assign a fresh v4 uuid to the request and echo it on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// One structured log line per handled request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let bytes_in = content_length(request.headers());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let start = Instant::now();
    let response = next.run(request).await;

    let status = response.status().as_u16();
    let bytes_out = content_length(response.headers());
    let duration_ms = start.elapsed().as_millis();
    log::info!(
        "request handled method={method} path={path} status={status} \
         duration_ms={duration_ms} bytes_in={bytes_in} bytes_out={bytes_out} \
         request_id={request_id}"
    );
    response
}

/// Observe request duration, sizes, and server-error count.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let verb = request.method().to_string();
    let path = request.uri().path().to_string();
    let bytes_in = content_length(request.headers());

    let start = Instant::now();
    let response = next.run(request).await;

    state.http_metrics.observe(
        &path,
        &verb,
        response.status().as_u16(),
        start.elapsed(),
        bytes_in,
        content_length(response.headers()),
    );
    response
}

/// Permissive CORS: any origin, the service's methods, common headers.
/// Preflight requests are answered directly with 204.
pub async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Link"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("300"),
    );
    response
}

/// Clickjacking and reflected-XSS response headers, on every route.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-xss-protection",
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("deny"));
    response
}

//! Per-request span, request id and access log for the HTTP routers

use crate::common::metrics::METRICS;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tags the request with an id (the caller's `X-Request-ID`, or a fresh
/// one), runs it inside a span, echoes the id on the response and records
/// latency under the route template, so `/files/:name` stays one series.
///
/// Must be installed with `Router::route_layer` for `MatchedPath` to exist.
pub async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let started = Instant::now();

    let request_id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(value) => value
            .to_str()
            .map(str::to_string)
            .unwrap_or_else(|_| generate_request_id()),
        None => generate_request_id(),
    };
    let method = request.method().clone();
    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => request.uri().path().to_string(),
    };

    let span = tracing::info_span!("request", id = %request_id, %method, %route);
    let mut response = next.run(request).instrument(span).await;

    let elapsed = started.elapsed();
    let status = response.status();
    METRICS.record_request(&route, elapsed, status.is_server_error());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let elapsed_ms = elapsed.as_millis() as u64;
    let status = status.as_u16();
    if status >= 500 {
        tracing::warn!(id = %request_id, %method, %route, status, elapsed_ms, "Request failed");
    } else if status >= 400 {
        tracing::debug!(id = %request_id, %method, %route, status, elapsed_ms, "Request rejected");
    } else {
        tracing::info!(id = %request_id, %method, %route, status, elapsed_ms, "Request served");
    }

    response
}

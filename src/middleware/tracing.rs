// ABOUTME: Request tracing spans for correlation and structured logging
// ABOUTME: Generates request IDs and creates spans for HTTP requests and model exchanges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use axum::http::Request;
use tracing::Span;
use uuid::Uuid;

/// Request id from `x-request-id`, or a generated one
#[must_use]
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(|| format!("req_{}", Uuid::new_v4().simple()), str::to_owned)
}

/// Span for an HTTP request, used as the `TraceLayer` span maker
pub fn create_request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request),
        uid = tracing::field::Empty,
        status_code = tracing::field::Empty,
    )
}

/// Span for one conversation exchange
pub fn create_exchange_span(origin: &str, business_uid: Option<&str>) -> Span {
    tracing::info_span!(
        "model_exchange",
        origin = %origin,
        business_uid = business_uid.unwrap_or("-"),
        round_trips = tracing::field::Empty,
        total_tokens = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_prefers_header() {
        let request = Request::builder()
            .header("x-request-id", "abc")
            .body(())
            .unwrap();
        assert_eq!(request_id(&request), "abc");

        let generated = request_id(&Request::builder().body(()).unwrap());
        assert!(generated.starts_with("req_"));
    }
}

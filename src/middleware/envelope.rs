// ABOUTME: Response envelope middleware wrapping handler output as {success, data|error}
// ABOUTME: Leaves the Facebook webhook and already-enveloped bodies untouched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use tracing::warn;

use crate::constants::limits::MAX_BODY_BYTES;
use crate::constants::routes::FACEBOOK_WEBHOOK;
use crate::errors::AppError;

/// Wrap the handler's body in the response envelope
///
/// - bodies that already carry `success` pass through
/// - objects with an `error` field become `{success: false, error}`
/// - other error statuses become `{success: false, error}` with the body as the error
/// - anything else becomes `{success: true, data}`; plain text is wrapped as a string
pub async fn envelope_middleware(request: Request, next: Next) -> Response {
    if request.uri().path() == FACEBOOK_WEBHOOK {
        return next.run(request).await;
    }

    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to buffer response body: {e}");
            return AppError::internal("Response body could not be read").into_response();
        }
    };

    let enveloped = envelope(&bytes, parts.status);
    let Ok(serialized) = serde_json::to_vec(&enveloped) else {
        return AppError::internal("Response body could not be serialized").into_response();
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(serialized))
}

fn envelope(bytes: &[u8], status: StatusCode) -> Value {
    let data = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    };

    match data {
        Value::Object(ref map) if map.contains_key("success") => data,
        Value::Object(ref map) if map.contains_key("error") => json!({
            "success": false,
            "error": map.get("error").cloned().unwrap_or(Value::Null),
        }),
        other if status.is_client_error() || status.is_server_error() => {
            json!({ "success": false, "error": other })
        }
        other => json!({ "success": true, "data": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shapes() {
        let ok = StatusCode::OK;
        assert_eq!(
            envelope(br#"{"uid":"u1"}"#, ok),
            json!({"success": true, "data": {"uid": "u1"}})
        );
        assert_eq!(
            envelope(b"Hello from Algecom API!", ok),
            json!({"success": true, "data": "Hello from Algecom API!"})
        );
        assert_eq!(
            envelope(br#"{"success":false,"error":"nope"}"#, StatusCode::UNAUTHORIZED),
            json!({"success": false, "error": "nope"})
        );
        assert_eq!(
            envelope(br#"{"error":"bad"}"#, ok),
            json!({"success": false, "error": "bad"})
        );
        assert_eq!(envelope(b"", ok), json!({"success": true, "data": null}));
        assert_eq!(
            envelope(b"Failed to parse the request body as JSON", StatusCode::BAD_REQUEST),
            json!({"success": false, "error": "Failed to parse the request body as JSON"})
        );
    }
}

// ABOUTME: Structured error type for calls to Facebook, Google and Gemini HTTP APIs
// ABOUTME: Extracts upstream error messages and maps failures onto AppError codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::errors::AppError;

/// Failure of a single upstream HTTP call
#[derive(Debug, Error)]
pub enum ProviderCallError {
    /// Upstream answered with a non-success status
    #[error("{provider} API error ({status_code}): {message}")]
    ApiError {
        /// Upstream service name
        provider: &'static str,
        /// HTTP status returned
        status_code: u16,
        /// Extracted error message
        message: String,
        /// Provider specific numeric error code (Graph API `error.code`)
        error_code: Option<i64>,
    },
    /// Upstream rate limit
    #[error("{provider} rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Upstream service name
        provider: &'static str,
        /// Extracted error message
        message: String,
    },
    /// Connection failed before a response was received
    #[error("{provider} network error: {message}")]
    NetworkError {
        /// Upstream service name
        provider: &'static str,
        /// Transport error description
        message: String,
    },
    /// Call exceeded its time budget
    #[error("{provider} did not answer within {timeout_secs}s")]
    Timeout {
        /// Upstream service name
        provider: &'static str,
        /// Budget that was exceeded
        timeout_secs: u64,
    },
    /// Response body could not be decoded
    #[error("{provider} returned an unexpected {field}: {source}")]
    ParseError {
        /// Upstream service name
        provider: &'static str,
        /// What was being decoded
        field: &'static str,
        /// Decoder error
        source: serde_json::Error,
    },
}

impl ProviderCallError {
    /// Build an error from a non-success response body
    ///
    /// The message is taken from `error.message`, then `error_description`,
    /// then a string `error` field, falling back to `HTTP <status>`.
    #[must_use]
    pub fn from_response(provider: &'static str, status: StatusCode, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Self::RateLimitExceeded { provider, message };
        }

        let error_code = parsed
            .as_ref()
            .and_then(|value| value.get("error"))
            .and_then(|error| error.get("code"))
            .and_then(Value::as_i64);

        Self::ApiError {
            provider,
            status_code: status.as_u16(),
            message,
            error_code,
        }
    }

    /// Classify a transport failure reported by reqwest
    #[must_use]
    pub fn from_transport(
        provider: &'static str,
        error: &reqwest::Error,
        timeout_secs: u64,
    ) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                provider,
                timeout_secs,
            }
        } else {
            // Query strings carry access tokens and API keys
            let message = error.url().map_or_else(
                || error.to_string(),
                |url| error.to_string().replace(url.as_str(), url.path()),
            );
            Self::NetworkError { provider, message }
        }
    }

    /// Upstream service name
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        match self {
            Self::ApiError { provider, .. }
            | Self::RateLimitExceeded { provider, .. }
            | Self::NetworkError { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ParseError { provider, .. } => *provider,
        }
    }

    /// HTTP status, when the upstream answered
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimitExceeded { .. } => Some(429),
            _ => None,
        }
    }

    /// Message a matcher can inspect for authorization phrases
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::ApiError { message, .. }
            | Self::RateLimitExceeded { message, .. }
            | Self::NetworkError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the same call may succeed if retried later
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::RateLimitExceeded { .. } | Self::NetworkError { .. } | Self::Timeout { .. } => {
                true
            }
            Self::ParseError { .. } => false,
        }
    }
}

fn extract_error_message(body: &Value) -> Option<String> {
    let error = body.get("error");
    error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| body.get("error_description").and_then(Value::as_str))
        .or_else(|| error.and_then(Value::as_str))
        .map(str::to_owned)
}

impl From<ProviderCallError> for AppError {
    fn from(error: ProviderCallError) -> Self {
        let provider = error.provider();
        let app = match &error {
            ProviderCallError::Timeout { timeout_secs, .. } => {
                Self::upstream_timeout(provider, *timeout_secs)
            }
            ProviderCallError::RateLimitExceeded { message, .. } => {
                Self::rate_limited(provider, message.clone())
            }
            ProviderCallError::NetworkError { message, .. } => {
                Self::upstream_unavailable(provider, message.clone())
            }
            ProviderCallError::ApiError {
                status_code,
                message,
                ..
            } if *status_code >= 500 => Self::upstream_unavailable(provider, message.clone()),
            ProviderCallError::ApiError { message, .. } => {
                Self::external_service(provider, message.clone())
            }
            ProviderCallError::ParseError { .. } => {
                Self::external_service(provider, error.to_string())
            }
        };
        app.with_source(error)
    }
}

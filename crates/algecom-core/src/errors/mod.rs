// ABOUTME: Unified error handling with standard error codes and HTTP response mapping
// ABOUTME: Defines ErrorCode, AppError and the {success:false, error} response body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Unified Error Handling System
//!
//! Every fallible operation in the server returns [`AppResult`]. Errors carry a
//! stable [`ErrorCode`] that decides the HTTP status and whether the caller may
//! retry. The user-visible body is always `{"success": false, "error": "..."}`;
//! internal failures are rendered with a generic description so no internal
//! identifiers leak.

/// Tool-specific error types
pub mod tool;

pub use tool::ToolError;

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the application
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Sessions (1000-1999)
    /// No credentials were supplied
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    /// Supplied credentials were rejected
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    /// A provider credential was rejected and a refresh was attempted
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,
    /// Refresh failed or the retry after refresh was rejected again
    #[serde(rename = "AUTH_EXHAUSTED")]
    AuthExhausted = 1003,
    /// Authorization failed and no refresh token is stored for the credential
    #[serde(rename = "REFRESH_TOKEN_MISSING")]
    RefreshTokenMissing = 1004,
    /// Session cookie missing, forged, malformed or expired
    #[serde(rename = "SESSION_INVALID")]
    SessionInvalid = 1005,

    // Validation (3000-3999)
    /// Request payload is invalid
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // Resource Management (4000-4999)
    /// Resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    /// Resource already exists
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists = 4001,

    // External Services (5000-5999)
    /// Third-party service answered with an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// Third-party service unreachable or answered 5xx
    #[serde(rename = "UPSTREAM_UNAVAILABLE")]
    UpstreamUnavailable = 5001,
    /// Third-party call exceeded its time budget
    #[serde(rename = "UPSTREAM_TIMEOUT")]
    UpstreamTimeout = 5002,
    /// Third-party rate limit hit
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,

    // Conversation & Tools (7000-7999)
    /// The model refused to answer the prompt
    #[serde(rename = "CONTENT_BLOCKED")]
    ContentBlocked = 7000,
    /// The model requested an undeclared function
    #[serde(rename = "TOOL_NOT_FOUND")]
    ToolNotFound = 7001,
    /// Tool logic failed or the tool loop did not converge
    #[serde(rename = "TOOL_EXECUTION_FAILED")]
    ToolExecutionFailed = 7002,
    /// The exchange was cancelled by the caller
    #[serde(rename = "CANCELLED")]
    Cancelled = 7003,

    // Configuration (6000-6999)
    /// Generic configuration error
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// JSON (de)serialization failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 400,

            Self::AuthRequired
            | Self::AuthInvalid
            | Self::AuthExpired
            | Self::AuthExhausted
            | Self::RefreshTokenMissing
            | Self::SessionInvalid => 401,

            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists => 409,
            Self::ContentBlocked => 422,
            Self::ExternalRateLimited => 429,
            Self::Cancelled => 499,

            Self::ExternalServiceError | Self::UpstreamUnavailable | Self::ToolNotFound => 502,
            Self::UpstreamTimeout => 504,

            Self::ToolExecutionFailed
            | Self::ConfigError
            | Self::InternalError
            | Self::SerializationError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided authentication credentials are invalid",
            Self::AuthExpired => "The provider credential has expired",
            Self::AuthExhausted => "The provider credential could not be renewed",
            Self::RefreshTokenMissing => "No refresh token available",
            Self::SessionInvalid => "Authentication required for this endpoint",
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::UpstreamUnavailable => "An external service is currently unavailable",
            Self::UpstreamTimeout => "An external service did not answer in time",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ContentBlocked => "The AI model refused to answer this message",
            Self::ToolNotFound => "The AI model requested an unknown function",
            Self::ToolExecutionFailed => "The AI agent could not complete the request",
            Self::Cancelled => "The request was cancelled",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal server error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether the same request may succeed if retried later
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable | Self::UpstreamTimeout | Self::ExternalRateLimited
        )
    }

    /// Whether the raw message may be shown to end users
    const fn exposes_message(self) -> bool {
        !matches!(
            self,
            Self::InternalError | Self::SerializationError | Self::ConfigError
        )
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Principal (user) the failing operation ran for
    pub principal_id: Option<String>,
    /// Resource identifier if applicable
    pub resource_id: Option<String>,
    /// Additional key-value context, logged but never rendered
    pub details: serde_json::Value,
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Attach the principal the failing operation ran for
    #[must_use]
    pub fn with_principal(mut self, principal_id: impl Into<String>) -> Self {
        self.context.principal_id = Some(principal_id.into());
        self
    }

    /// Attach a resource identifier
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Whether retrying the operation may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Message safe to return to API callers
    #[must_use]
    pub fn user_message(&self) -> &str {
        if self.code.exposes_message() && !self.message.is_empty() {
            &self.message
        } else {
            self.code.description()
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// User-facing error message
    pub error: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            success: false,
            error: error.user_message().to_owned(),
        }
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    #[must_use]
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Provider rejected the credential
    #[must_use]
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExpired, message)
    }

    /// Refresh unavailable, or refresh-then-retry failed
    #[must_use]
    pub fn auth_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthExhausted, message)
    }

    /// Authorization failed and the credential has no refresh token
    #[must_use]
    pub fn refresh_token_missing(provider: impl Into<String>) -> Self {
        Self::new(ErrorCode::RefreshTokenMissing, "No refresh token available")
            .with_resource_id(provider)
    }

    /// Session artifact missing or rejected
    #[must_use]
    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SessionInvalid, message)
    }

    /// Model refused the prompt
    #[must_use]
    pub fn content_blocked(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ContentBlocked,
            format!("Prompt blocked by the AI model: {}", reason.into()),
        )
    }

    /// Model asked for a function that is not registered
    #[must_use]
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorCode::ToolNotFound, format!("Tool '{name}' not found"))
            .with_resource_id(name)
    }

    /// Tool loop failure
    #[must_use]
    pub fn tool_execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ToolExecutionFailed, message)
    }

    /// Upstream unreachable or 5xx
    #[must_use]
    pub fn upstream_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamUnavailable,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Upstream call exceeded the configured timeout
    #[must_use]
    pub fn upstream_timeout(service: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(
            ErrorCode::UpstreamTimeout,
            format!("{} did not answer within {timeout_secs}s", service.into()),
        )
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// External rate limit
    #[must_use]
    pub fn rate_limited(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalRateLimited,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Resource already exists
    #[must_use]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Exchange cancelled by the caller
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Request cancelled")
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::StatusCode;
    use tracing::{error, warn};

    use super::{AppError, ErrorResponse};

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if status.is_server_error() {
                error!(code = ?self.code, details = %self.context.details, "{}", self.message);
            } else {
                warn!(code = ?self.code, "{}", self.message);
            }

            (status, Json(ErrorResponse::from(&self))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::SessionInvalid.http_status(), 401);
        assert_eq!(ErrorCode::RefreshTokenMissing.http_status(), 401);
        assert_eq!(ErrorCode::ContentBlocked.http_status(), 422);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::UpstreamTimeout.http_status(), 504);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ErrorCode::UpstreamTimeout.is_retryable());
        assert!(ErrorCode::UpstreamUnavailable.is_retryable());
        assert!(!ErrorCode::AuthExhausted.is_retryable());
        assert!(!ErrorCode::ContentBlocked.is_retryable());
    }

    #[test]
    fn test_internal_messages_are_not_exposed() {
        let error = AppError::internal("lock poisoned in repository 0x7f");
        let body = ErrorResponse::from(&error);
        assert!(!body.success);
        assert_eq!(body.error, ErrorCode::InternalError.description());

        let error = AppError::invalid_input("Message is required");
        assert_eq!(ErrorResponse::from(&error).error, "Message is required");
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::refresh_token_missing("google");
        let json = serde_json::to_value(ErrorResponse::from(&error)).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "No refresh token available"})
        );
        assert_eq!(error.context.resource_id.as_deref(), Some("google"));
    }
}

// ABOUTME: Error re-exports from algecom-core plus conversions for server-side error sources
// ABOUTME: Keeps crate::errors as the single import path for AppError, ErrorCode and AppResult
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Unified Error Handling System
//!
//! The error types live in `algecom-core` so they can be shared with tooling
//! crates. This module re-exports them and adds conversions for error sources
//! that only the server crate depends on.

pub use algecom_core::errors::{
    AppError, AppResult, ErrorCode, ErrorContext, ErrorResponse, ToolError,
};

use jsonwebtoken::errors::Error as JwtError;

/// Convert a configuration error raised at the binary/config edge
#[must_use]
pub fn from_anyhow(error: &anyhow::Error) -> AppError {
    AppError::config(format!("{error:#}"))
}

/// Convert a JWT signing failure (verification failures go through `JwtValidationError`)
#[must_use]
pub fn from_jwt_signing(error: JwtError) -> AppError {
    AppError::internal(format!("Failed to sign session token: {error}")).with_source(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_conversion_is_config_error() {
        let error = anyhow::anyhow!("JWT_SECRET must be set");
        let app = from_anyhow(&error);
        assert_eq!(app.code, ErrorCode::ConfigError);
        assert_eq!(app.user_message(), ErrorCode::ConfigError.description());
    }
}

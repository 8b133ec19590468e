// ABOUTME: Classification of provider failures that mean the bearer token was rejected
// ABOUTME: Status, phrase and provider error-code matching with a Facebook variant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use crate::constants::oauth::{FACEBOOK_INVALID_TOKEN_CODE, INVALID_TOKEN_PHRASES};
use crate::providers::errors::ProviderCallError;

/// Decides whether a failed call should trigger a credential refresh
pub trait AuthFailureMatcher: Send + Sync {
    /// `true` when the provider rejected the credential itself
    fn is_auth_failure(&self, error: &ProviderCallError) -> bool;
}

/// Matcher driven by HTTP status, message phrases and provider error codes
///
/// Only answered calls are considered: timeouts and transport failures are
/// never treated as authorization failures.
#[derive(Debug, Clone)]
pub struct PhraseAuthFailureMatcher {
    statuses: Vec<u16>,
    phrases: Vec<String>,
    error_codes: Vec<i64>,
}

impl Default for PhraseAuthFailureMatcher {
    fn default() -> Self {
        Self {
            statuses: vec![401],
            phrases: INVALID_TOKEN_PHRASES.iter().map(|p| (*p).to_owned()).collect(),
            error_codes: Vec::new(),
        }
    }
}

impl PhraseAuthFailureMatcher {
    /// Status 401 or a message containing `invalid_token`, `Invalid Credentials` or `401`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default rules plus Graph API error code 190 (expired or revoked token)
    #[must_use]
    pub fn facebook() -> Self {
        Self::default().with_error_code(FACEBOOK_INVALID_TOKEN_CODE)
    }

    #[must_use]
    fn with_error_code(mut self, code: i64) -> Self {
        self.error_codes.push(code);
        self
    }
}

impl AuthFailureMatcher for PhraseAuthFailureMatcher {
    fn is_auth_failure(&self, error: &ProviderCallError) -> bool {
        let ProviderCallError::ApiError {
            status_code,
            message,
            error_code,
            ..
        } = error
        else {
            return false;
        };

        self.statuses.contains(status_code)
            || error_code.is_some_and(|code| self.error_codes.contains(&code))
            || self
                .phrases
                .iter()
                .any(|phrase| message.contains(phrase.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn api_error(status: StatusCode, body: &str) -> ProviderCallError {
        ProviderCallError::from_response("Test", status, body)
    }

    #[test]
    fn test_default_matcher_rules() {
        let matcher = PhraseAuthFailureMatcher::new();

        assert!(matcher.is_auth_failure(&api_error(StatusCode::UNAUTHORIZED, "{}")));
        assert!(matcher.is_auth_failure(&api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_token"}"#
        )));
        assert!(matcher.is_auth_failure(&api_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"message":"Invalid Credentials"}}"#
        )));
        assert!(!matcher.is_auth_failure(&api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Unable to parse range"}}"#
        )));
        assert!(!matcher.is_auth_failure(&ProviderCallError::Timeout {
            provider: "Test",
            timeout_secs: 30
        }));
    }

    #[test]
    fn test_facebook_matcher_uses_graph_code() {
        let body = r#"{"error":{"message":"Session has expired","type":"OAuthException","code":190}}"#;
        let error = api_error(StatusCode::BAD_REQUEST, body);

        assert!(!PhraseAuthFailureMatcher::new().is_auth_failure(&error));
        assert!(PhraseAuthFailureMatcher::facebook().is_auth_failure(&error));
    }
}

// ABOUTME: Shared HTTP client construction and JSON request execution for upstream APIs
// ABOUTME: Classifies transport failures, non-success statuses and decode errors uniformly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::providers::errors::ProviderCallError;

/// Create a new HTTP client with custom timeout settings
///
/// Falls back to a default client if the builder fails.
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for OAuth token exchanges, which should be fast operations
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(15, 5)
}

/// Client for provider API calls bounded by the configured upstream timeout
#[must_use]
pub fn api_client(timeout_secs: u64) -> Client {
    create_client_with_timeout(timeout_secs, 10)
}

/// Send a request and decode a JSON body, classifying every failure mode
///
/// # Errors
///
/// Returns `ProviderCallError` for transport failures, timeouts, non-success
/// statuses (with the upstream message extracted) and undecodable bodies.
pub async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    field: &'static str,
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<T, ProviderCallError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderCallError::from_transport(provider, &e, timeout_secs))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderCallError::from_transport(provider, &e, timeout_secs))?;

    if !status.is_success() {
        debug!(provider, status = status.as_u16(), "upstream call failed");
        return Err(ProviderCallError::from_response(provider, status, &body));
    }

    serde_json::from_str(&body).map_err(|source| ProviderCallError::ParseError {
        provider,
        field,
        source,
    })
}

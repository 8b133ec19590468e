// ABOUTME: Google Gemini generateContent client implementing the GenerativeModel trait
// ABOUTME: Posts conversation, tools and generation config; maps quota errors to friendly messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Gemini Provider
//!
//! ```rust,no_run
//! use algecom_server::config::GeminiConfig;
//! use algecom_server::llm::GeminiProvider;
//!
//! fn build(config: &GeminiConfig) -> GeminiProvider {
//!     GeminiProvider::new(config, 30)
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{GenerateRequest, GenerateResponse, GenerativeModel};
use crate::config::GeminiConfig;
use crate::constants::service_names::GEMINI;
use crate::errors::{AppError, AppResult};
use crate::providers::errors::ProviderCallError;
use crate::utils::http_client::{api_client, send_json};

/// Google Gemini model client
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    timeout_secs: u64,
}

impl GeminiProvider {
    /// Create a provider for the configured model
    #[must_use]
    pub fn new(config: &GeminiConfig, timeout_secs: u64) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client: api_client(timeout_secs),
            timeout_secs,
        }
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Map upstream failures, turning quota errors into a retry hint
    fn map_error(error: ProviderCallError) -> AppError {
        if let ProviderCallError::RateLimitExceeded { message, .. } = &error {
            let friendly = extract_quota_message(message);
            return AppError::rate_limited(GEMINI, friendly).with_source(error);
        }
        AppError::from(error)
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, turns = request.contents.len()))]
    async fn generate(&self, request: &GenerateRequest) -> AppResult<GenerateResponse> {
        if self.api_key.is_empty() {
            return Err(AppError::config("GEMINI_API_KEY is not configured"));
        }

        let http_request = self
            .client
            .post(self.build_url())
            .query(&[("key", self.api_key.as_str())])
            .json(request);

        let response: GenerateResponse =
            send_json(GEMINI, "generateContent response", http_request, self.timeout_secs)
                .await
                .map_err(Self::map_error)?;

        debug!(
            candidates = response.candidates.len(),
            total_tokens = response.total_tokens(),
            "received Gemini response"
        );
        Ok(response)
    }
}

/// `"... Please retry in 6.4s."` becomes a whole-second retry hint
fn extract_quota_message(message: &str) -> String {
    const MARKER: &str = "Please retry in ";

    message
        .find(MARKER)
        .map(|pos| &message[pos + MARKER.len()..])
        .and_then(|rest| rest.split_once('s'))
        .and_then(|(seconds, _)| seconds.parse::<f64>().ok())
        .map_or_else(
            || "AI service quota exceeded. Please wait a moment and try again.".to_owned(),
            |seconds| {
                format!(
                    "AI service quota exceeded. Please try again in {} seconds.",
                    seconds.ceil() as u64
                )
            },
        )
}

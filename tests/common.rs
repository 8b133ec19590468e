// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides test configuration, scripted models, session cookies and resource wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `algecom_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use algecom_server::auth::SessionClaims;
use algecom_server::config::{
    AppInfoConfig, Environment, FacebookConfig, GeminiConfig, GoogleConfig, ServerConfig,
    SessionConfig,
};
use algecom_server::errors::AppResult;
use algecom_server::llm::{GenerateRequest, GenerateResponse, GenerativeModel};
use algecom_server::resources::{ServerResources, Stores};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Secret used to sign test sessions
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
/// Webhook verify token of the test Facebook app
pub const TEST_VERIFY_TOKEN: &str = "verify-me";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with every upstream pointed at `base_url`
///
/// - Facebook Graph: `{base_url}/v22.0/...`
/// - Google token endpoint: `{base_url}/oauth/token`
/// - Google Sheets: `{base_url}/sheets/...`
/// - Google userinfo: `{base_url}/userinfo`
/// - Gemini: `{base_url}/gemini/models/...`
pub fn test_config(base_url: &str) -> ServerConfig {
    ServerConfig {
        http_port: 0,
        environment: Environment::Testing,
        session: SessionConfig {
            jwt_secret: TEST_JWT_SECRET.to_owned(),
            renewal_threshold_secs: 10 * 24 * 60 * 60,
            ttl_secs: 60 * 24 * 60 * 60,
        },
        facebook: FacebookConfig {
            client_id: "fb-app".to_owned(),
            client_secret: "fb-secret".to_owned(),
            verify_webhook_token: TEST_VERIFY_TOKEN.to_owned(),
            api_version: "v22.0".to_owned(),
            graph_base_url: base_url.to_owned(),
        },
        google: GoogleConfig {
            client_id: "google-client".to_owned(),
            client_secret: "google-secret".to_owned(),
            redirect_uri: "https://app.example.com".to_owned(),
            oauth_base_url: format!("{base_url}/oauth"),
            sheets_base_url: format!("{base_url}/sheets"),
            userinfo_url: format!("{base_url}/userinfo"),
        },
        gemini: GeminiConfig {
            api_key: "gemini-key".to_owned(),
            model: "gemini-test".to_owned(),
            base_url: format!("{base_url}/gemini"),
            max_round_trips: 8,
            max_output_tokens: 4096,
            temperature: 0.7,
        },
        upstream_timeout_secs: 5,
        cors_origins: "*".to_owned(),
        app: AppInfoConfig {
            name: "Algecom".to_owned(),
            information: "You are the Algecom assistant.".to_owned(),
        },
        cron_secret: None,
    }
}

/// Resources around in-memory stores and the given model
pub fn test_resources(
    config: ServerConfig,
    model: Arc<dyn GenerativeModel>,
) -> Arc<ServerResources> {
    init_test_logging();
    Arc::new(ServerResources::new(
        Arc::new(config),
        Stores::in_memory(),
        model,
    ))
}

/// `Cookie` header value carrying a freshly signed session
pub fn session_cookie(resources: &ServerResources, claims: SessionClaims) -> String {
    let (signed, _) = resources.guard.issue(claims, Utc::now()).unwrap();
    format!("authToken={}", signed.token)
}

/// Model that replays queued responses and records every request
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<AppResult<GenerateResponse>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    /// Model answering with `responses` in order
    pub fn new(responses: Vec<GenerateResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of model calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> AppResult<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("(script exhausted)", 0)))
    }
}

/// Model whose calls never complete
pub struct HangingModel;

#[async_trait]
impl GenerativeModel for HangingModel {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: &GenerateRequest) -> AppResult<GenerateResponse> {
        std::future::pending().await
    }
}

/// Response with a single text part
pub fn text_response(text: &str, total_tokens: u64) -> GenerateResponse {
    response_with_parts(&[json!({ "text": text })], total_tokens)
}

/// Response with a single function call part
pub fn call_response(name: &str, args: Value, total_tokens: u64) -> GenerateResponse {
    response_with_parts(
        &[json!({ "functionCall": { "name": name, "args": args } })],
        total_tokens,
    )
}

/// Response with arbitrary parts
pub fn response_with_parts(parts: &[Value], total_tokens: u64) -> GenerateResponse {
    serde_json::from_value(json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "totalTokenCount": total_tokens }
    }))
    .unwrap()
}

/// Response whose prompt was blocked
pub fn blocked_response(reason: &str) -> GenerateResponse {
    serde_json::from_value(json!({ "promptFeedback": { "blockReason": reason } })).unwrap()
}

// ABOUTME: Integration tests for the Gemini generateContent client against a mock server
// ABOUTME: Checks request shape, response decoding and quota error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use algecom_server::errors::ErrorCode;
use algecom_server::llm::{
    ConversationTurn, GenerateRequest, GenerationConfig, GeminiProvider, GenerativeModel, Part,
};
use common::{init_test_logging, test_config};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/gemini/models/gemini-test:generateContent";

fn provider(server: &MockServer) -> GeminiProvider {
    init_test_logging();
    GeminiProvider::new(&test_config(&server.uri()).gemini, 5)
}

fn user_request(text: &str) -> GenerateRequest {
    GenerateRequest::new(
        vec![ConversationTurn::user_text(text)],
        GenerationConfig::default(),
    )
}

#[tokio::test]
async fn test_generate_posts_contents_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Any mugs left?"}]}],
            "generationConfig": {"maxOutputTokens": 4096}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "checkInventory", "args": {}}}]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 30, "totalTokenCount": 42}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server)
        .generate(&user_request("Any mugs left?"))
        .await
        .unwrap();

    assert_eq!(response.total_tokens(), 42);
    let parts: Vec<&Part> = response.parts().collect();
    assert!(matches!(
        parts[0],
        Part::FunctionCall { function_call } if function_call.name == "checkInventory"
    ));
}

#[tokio::test]
async fn test_quota_error_becomes_retry_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota. Please retry in 6.4s.",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let error = provider(&server)
        .generate(&user_request("hi"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalRateLimited);
    assert!(error.message.contains("try again in 7 seconds"));
}

#[tokio::test]
async fn test_server_error_is_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": {"message": "overloaded"}})),
        )
        .mount(&server)
        .await;

    let error = provider(&server)
        .generate(&user_request("hi"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::UpstreamUnavailable);
}

#[tokio::test]
async fn test_missing_api_key_is_config_error() {
    let server = MockServer::start().await;
    let mut config = test_config(&server.uri()).gemini;
    config.api_key = String::new();

    let error = GeminiProvider::new(&config, 5)
        .generate(&user_request("hi"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::ConfigError);
}

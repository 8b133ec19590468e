// ABOUTME: Bounded tool-calling loop between the generative model and the business tool registry
// ABOUTME: Executes function calls, folds results into the history and resubmits until plain text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::GeminiConfig;
use crate::constants::service_names::GEMINI;
use crate::errors::{AppError, AppResult};
use crate::llm::{
    ConversationTurn, FunctionCall, GenerateRequest, GenerateResponse, GenerationConfig,
    GenerativeModel, Part, SystemInstruction, ToolDeclarations,
};
use crate::logging::AppLogger;
use crate::tools::ToolRegistry;

/// Limits of one exchange
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Model calls allowed per exchange
    pub max_round_trips: usize,
    /// Sampling parameters sent with every call
    pub generation_config: GenerationConfig,
    /// Bound on each model call
    pub call_timeout: Duration,
}

impl EngineConfig {
    /// Limits from the Gemini configuration
    #[must_use]
    pub const fn from_gemini(config: &GeminiConfig, call_timeout: Duration) -> Self {
        Self {
            max_round_trips: config.max_round_trips,
            generation_config: GenerationConfig {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            },
            call_timeout,
        }
    }
}

/// Input of one exchange
#[derive(Debug, Clone, Default)]
pub struct ExchangeRequest {
    /// Conversation so far, oldest first, ending with the new user message
    pub history: Vec<ConversationTurn>,
    /// Persona and business context
    pub system_instruction: Option<String>,
}

/// Token and round-trip accounting of one exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    /// Sum of `usageMetadata.totalTokenCount` over all round-trips
    pub total_tokens: u64,
    /// Model calls made
    pub round_trips: usize,
}

impl UsageCounter {
    fn record(&mut self, response: &GenerateResponse) {
        self.round_trips += 1;
        self.total_tokens += response.total_tokens();
    }
}

/// Result of one exchange
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    /// Final answer
    pub text: String,
    /// Accounting over all round-trips
    pub usage: UsageCounter,
    /// History including every function call and response added during the exchange
    pub transcript: Vec<ConversationTurn>,
}

/// What one model response asks for
#[derive(Debug, Default)]
struct ResponseScan {
    calls: Vec<FunctionCall>,
    last_text: Option<String>,
}

impl ResponseScan {
    fn of(response: &GenerateResponse) -> Self {
        let mut scan = Self::default();
        for part in response.parts() {
            match part {
                Part::Text { text } if !text.trim().is_empty() => {
                    scan.last_text = Some(text.clone());
                }
                Part::FunctionCall { function_call } => scan.calls.push(function_call.clone()),
                _ => {}
            }
        }
        scan
    }
}

/// Drives exchanges against one model
pub struct ConversationEngine {
    model: Arc<dyn GenerativeModel>,
    config: EngineConfig,
}

impl ConversationEngine {
    /// Create an engine for `model`
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>, config: EngineConfig) -> Self {
        Self { model, config }
    }

    /// Configured limits
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one exchange to a final text answer
    ///
    /// Every function call in a response is executed in order; its call and
    /// result are appended to the history before the model is called again.
    /// The last non-empty text part of the final response is the answer.
    ///
    /// # Errors
    ///
    /// - `ContentBlocked` when the model blocks the prompt
    /// - `ToolNotFound` when the model calls an unregistered tool
    /// - `ToolExecutionFailed` when the round-trip bound is exceeded
    /// - `ExternalServiceError` when the final response carries no text
    /// - `UpstreamTimeout` when a model call exceeds the call timeout
    /// - `Cancelled` when `cancel` fires; usage is discarded
    #[instrument(skip_all, fields(model = %self.model.name(), tools = tools.len()))]
    pub async fn run(
        &self,
        request: ExchangeRequest,
        tools: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> AppResult<ExchangeOutcome> {
        let started = Instant::now();
        let mut usage = UsageCounter::default();
        let mut payload = self.build_request(request, tools);

        loop {
            if usage.round_trips >= self.config.max_round_trips {
                warn!(round_trips = usage.round_trips, "exchange exceeded round-trip bound");
                return Err(AppError::tool_execution_failed(format!(
                    "Model did not produce an answer within {} round-trips",
                    self.config.max_round_trips
                )));
            }

            let response = self.call_model(&payload, cancel).await?;

            if let Some(reason) = response.block_reason() {
                warn!(reason, "model blocked the prompt");
                return Err(AppError::content_blocked(reason));
            }
            usage.record(&response);

            let scan = ResponseScan::of(&response);
            if scan.calls.is_empty() {
                let text = scan.last_text.ok_or_else(|| {
                    AppError::external_service(GEMINI, "Model returned no text response")
                })?;
                AppLogger::log_model_exchange(
                    self.model.name(),
                    usage.round_trips,
                    usage.total_tokens,
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                );
                return Ok(ExchangeOutcome {
                    text,
                    usage,
                    transcript: payload.contents,
                });
            }

            info!(
                round_trip = usage.round_trips,
                calls = scan.calls.len(),
                "executing function calls"
            );
            for call in scan.calls {
                let result = Self::execute_call(&call, tools, cancel).await?;
                let name = call.name.clone();
                payload.contents.push(ConversationTurn::function_call(call));
                payload
                    .contents
                    .push(ConversationTurn::function_response(name, result));
            }
        }
    }

    fn build_request(&self, request: ExchangeRequest, tools: &ToolRegistry) -> GenerateRequest {
        let mut payload = GenerateRequest::new(request.history, self.config.generation_config);
        payload.system_instruction = request.system_instruction.map(SystemInstruction::text);
        if !tools.is_empty() {
            payload.tools = vec![ToolDeclarations {
                function_declarations: tools.declarations(),
            }];
        }
        payload
    }

    async fn call_model(
        &self,
        payload: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> AppResult<GenerateResponse> {
        if cancel.is_cancelled() {
            return Err(AppError::cancelled());
        }

        let call = tokio::time::timeout(self.config.call_timeout, self.model.generate(payload));
        tokio::select! {
            () = cancel.cancelled() => Err(AppError::cancelled()),
            result = call => result.unwrap_or_else(|_| {
                Err(AppError::upstream_timeout(GEMINI, self.config.call_timeout.as_secs()))
            }),
        }
    }

    /// Run one call; recoverable tool errors become `{"error": ...}` for the model
    async fn execute_call(
        call: &FunctionCall,
        tools: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> AppResult<serde_json::Value> {
        if cancel.is_cancelled() {
            return Err(AppError::cancelled());
        }

        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(AppError::cancelled()),
            outcome = tools.invoke(&call.name, &call.args) => outcome,
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(error) if error.is_recoverable() => {
                debug!(tool = %call.name, "tool error reported to model: {error}");
                Ok(json!({ "error": error.to_string() }))
            }
            Err(error) => Err(AppError::tool_not_found(&call.name).with_source(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Candidate, CandidateContent, Role, UsageMetadata};

    fn text_response(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    role: Some(Role::Model),
                    parts: vec![Part::text("thinking"), Part::text(text)],
                }),
                finish_reason: Some("STOP".to_owned()),
            }],
            usage_metadata: Some(UsageMetadata {
                total_token_count: 7,
                ..UsageMetadata::default()
            }),
            prompt_feedback: None,
        }
    }

    #[test]
    fn test_scan_takes_last_text() {
        let scan = ResponseScan::of(&text_response("final"));
        assert_eq!(scan.last_text.as_deref(), Some("final"));
        assert!(scan.calls.is_empty());
    }

    #[test]
    fn test_usage_counter_records() {
        let mut usage = UsageCounter::default();
        usage.record(&text_response("a"));
        usage.record(&text_response("b"));
        assert_eq!(usage.total_tokens, 14);
        assert_eq!(usage.round_trips, 2);
    }
}

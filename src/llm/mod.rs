// ABOUTME: Generative model abstraction and the generateContent wire types
// ABOUTME: Conversation turns, function-call parts, tool declarations and usage metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Generative Model Interface
//!
//! The conversation engine talks to a [`GenerativeModel`] using the
//! `generateContent` request and response shapes directly, so the history it
//! builds is exactly what is sent upstream.
//!
//! ## Example: One-shot request
//!
//! ```rust,no_run
//! use algecom_server::llm::{ConversationTurn, GenerateRequest, GenerationConfig, GenerativeModel};
//!
//! async fn example(model: &dyn GenerativeModel) {
//!     let request = GenerateRequest::new(
//!         vec![ConversationTurn::user_text("Do you deliver on Sundays?")],
//!         GenerationConfig::default(),
//!     );
//!     let response = model.generate(&request).await;
//! }
//! ```

mod gemini;
pub mod prompts;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::llm::{MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::errors::AppResult;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Customer or caller
    User,
    /// The generative model
    Model,
}

/// Function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Tool name
    pub name: String,
    /// Arguments object
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Result of a function call, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Tool name
    pub name: String,
    /// Tool output, or `{"error": ...}`
    pub response: Value,
}

/// Part of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// Text content
    Text {
        /// Text
        text: String,
    },
    /// Function call from the model
    FunctionCall {
        /// Call
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    /// Function result
    FunctionResponse {
        /// Result
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    /// Part kinds the engine does not act on (inline data, executable code)
    Other(Value),
}

impl Part {
    /// Text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Author
    pub role: Role,
    /// Content
    pub parts: Vec<Part>,
}

impl ConversationTurn {
    /// User text turn
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Model text turn
    #[must_use]
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Model turn carrying a function call
    #[must_use]
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionCall {
                function_call: call,
            }],
        }
    }

    /// Turn carrying a function result
    #[must_use]
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse {
                    name: name.into(),
                    response,
                },
            }],
        }
    }
}

/// System instruction content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInstruction {
    /// Instruction text parts
    pub parts: Vec<Part>,
}

impl SystemInstruction {
    /// Single-text instruction
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }
}

/// Tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Tool name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// JSON schema of the arguments object; omitted for argument-less tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// `tools[]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclarations {
    /// Declared functions
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Output token cap
    pub max_output_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

/// `generateContent` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Conversation so far
    pub contents: Vec<ConversationTurn>,
    /// Persona and business context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Callable tools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclarations>,
    /// Sampling parameters
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    /// Request without system instruction or tools
    #[must_use]
    pub const fn new(contents: Vec<ConversationTurn>, generation_config: GenerationConfig) -> Self {
        Self {
            contents,
            system_instruction: None,
            tools: Vec::new(),
            generation_config,
        }
    }
}

/// Content of a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    /// Author, normally `model`
    #[serde(default)]
    pub role: Option<Role>,
    /// Parts in order
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One generated candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content
    #[serde(default)]
    pub content: Option<CandidateContent>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token accounting of one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_token_count: u64,
    /// Output tokens
    #[serde(default)]
    pub candidates_token_count: u64,
    /// Total tokens
    #[serde(default)]
    pub total_token_count: u64,
}

/// Safety verdict on the prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was blocked
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// `generateContent` response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Candidates; the engine scans all of them
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token accounting
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    /// Prompt safety verdict
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Block reason, if the prompt was rejected
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    /// `usageMetadata.totalTokenCount`, zero when absent
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.usage_metadata.map_or(0, |u| u.total_token_count)
    }

    /// All parts of all candidates, in order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }
}

/// Model backend used by the conversation engine
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier for logs
    fn name(&self) -> &str;

    /// Run one `generateContent` call
    async fn generate(&self, request: &GenerateRequest) -> AppResult<GenerateResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_camel_case() {
        let mut request = GenerateRequest::new(
            vec![ConversationTurn::user_text("hi")],
            GenerationConfig::default(),
        );
        request.system_instruction = Some(SystemInstruction::text("be nice"));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be nice");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 4096);
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_response_parts_parse() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "checkInventory", "args": {}}},
                        {"text": "Checking"},
                        {"inlineData": {"mimeType": "image/png", "data": ""}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 42}
        }))
        .unwrap();

        let parts: Vec<&Part> = response.parts().collect();
        assert!(matches!(
            parts[0],
            Part::FunctionCall { function_call } if function_call.name == "checkInventory"
        ));
        assert!(matches!(parts[1], Part::Text { text } if text == "Checking"));
        assert!(matches!(parts[2], Part::Other(_)));
        assert_eq!(response.total_tokens(), 42);
        assert_eq!(response.block_reason(), None);
    }

    #[test]
    fn test_block_reason() {
        let response: GenerateResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert_eq!(response.block_reason(), Some("SAFETY"));
        assert!(response.candidates.is_empty());
    }
}

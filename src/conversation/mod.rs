// ABOUTME: Conversation engine driving one model exchange with business tools
// ABOUTME: Re-exports the engine, its limits and the exchange request and outcome types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Conversation Engine
//!
//! ```rust,no_run
//! use algecom_server::conversation::{ConversationEngine, ExchangeRequest};
//! use algecom_server::llm::ConversationTurn;
//! use algecom_server::tools::ToolRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn reply(engine: &ConversationEngine) {
//!     let request = ExchangeRequest {
//!         history: vec![ConversationTurn::user_text("Is the blue mug in stock?")],
//!         system_instruction: Some("You are a shop assistant".to_owned()),
//!     };
//!     let outcome = engine
//!         .run(request, &ToolRegistry::new(), &CancellationToken::new())
//!         .await;
//! }
//! ```

mod engine;

pub use engine::{ConversationEngine, EngineConfig, ExchangeOutcome, ExchangeRequest, UsageCounter};

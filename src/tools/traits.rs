// ABOUTME: Defines the BusinessTool trait for functions the model may call mid-conversation
// ABOUTME: Tools expose a name, a description and a JSON schema, and execute against business data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Business Tool Trait
//!
//! A tool is bound to one business when it is built, so `execute` needs no
//! extra context. Arguments reach `execute` only after the registry has
//! validated them against `parameters_schema`.
//!
//! # Example
//!
//! ```rust,no_run
//! use algecom_server::tools::BusinessTool;
//! use algecom_core::errors::ToolError;
//! use async_trait::async_trait;
//! use serde_json::{json, Map, Value};
//!
//! struct OpeningHoursTool;
//!
//! #[async_trait]
//! impl BusinessTool for OpeningHoursTool {
//!     fn name(&self) -> &'static str {
//!         "openingHours"
//!     }
//!
//!     fn description(&self) -> &'static str {
//!         "Opening hours of the shop"
//!     }
//!
//!     fn parameters_schema(&self) -> Value {
//!         json!({"type": "object", "properties": {}})
//!     }
//!
//!     async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
//!         Ok(json!({"weekdays": "9-17"}))
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::ToolError;

/// Function the model may call
#[async_trait]
pub trait BusinessTool: Send + Sync {
    /// Name the model calls the tool by
    fn name(&self) -> &'static str;

    /// Description for the model
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object
    fn parameters_schema(&self) -> Value;

    /// Run the tool with validated arguments
    async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError>;
}

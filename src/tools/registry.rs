// ABOUTME: Registry of business tools offered to the model during one exchange
// ABOUTME: Resolves calls by exact name, validates arguments and renders function declarations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Tool Registry
//!
//! A registry is built per exchange and bound to one business, so two
//! conversations never share tools. Lookup is by exact name; arguments are
//! validated against the tool's schema before `execute` runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::traits::BusinessTool;
use super::validation::validate_arguments;
use crate::errors::ToolError;
use crate::llm::FunctionDeclaration;
use crate::logging::AppLogger;

/// Named tools the model may call
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn BusinessTool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// # Returns
    ///
    /// `true` if the tool was registered, `false` if a tool with the same name exists
    pub fn register(&mut self, tool: Arc<dyn BusinessTool>) -> bool {
        let name = tool.name().to_owned();

        if self.tools.contains_key(&name) {
            warn!("Tool '{}' is already registered, skipping", name);
            return false;
        }

        debug!("Registering tool '{}'", name);
        self.tools.insert(name, tool);
        true
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn BusinessTool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered names, sorted
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function declarations for the `tools` field of a model request, sorted by name
    ///
    /// Tools whose schema declares no properties are sent without `parameters`.
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                let schema = tool.parameters_schema();
                let has_properties = schema
                    .get("properties")
                    .and_then(Value::as_object)
                    .is_some_and(|props| !props.is_empty());
                FunctionDeclaration {
                    name: tool.name().to_owned(),
                    description: tool.description().to_owned(),
                    parameters: has_properties.then_some(schema),
                }
            })
            .collect()
    }

    /// Validate `args` and run the tool called `name`
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotFound` for an unknown name, a parameter error when
    /// validation fails (the tool is not run), or the tool's own error
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::not_found(name))?;

        if let Err(e) = validate_arguments(name, &tool.parameters_schema(), args) {
            AppLogger::log_tool_call(name, false, 0);
            return Err(e);
        }

        let started = Instant::now();
        let result = tool.execute(args).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        AppLogger::log_tool_call(name, result.is_ok(), elapsed_ms);
        result
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BusinessTool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the word back"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"word": {"type": "string"}},
                "required": ["word"]
            })
        }

        async fn execute(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"word": args.get("word").cloned().unwrap_or(Value::Null)}))
        }
    }

    struct PingTool;

    #[async_trait]
    impl BusinessTool for PingTool {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn description(&self) -> &'static str {
            "Ping"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
            Ok(json!("pong"))
        }
    }

    fn registry(echo: Arc<EchoTool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(echo);
        registry.register(Arc::new(PingTool));
        registry
    }

    #[tokio::test]
    async fn test_invoke_runs_tool() {
        let echo = Arc::new(EchoTool {
            calls: AtomicUsize::new(0),
        });
        let registry = registry(echo.clone());

        let mut args = Map::new();
        args.insert("word".to_owned(), json!("hi"));
        let value = registry.invoke("echo", &args).await.unwrap();

        assert_eq!(value, json!({"word": "hi"}));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_execute() {
        let echo = Arc::new(EchoTool {
            calls: AtomicUsize::new(0),
        });
        let registry = registry(echo.clone());

        let result = registry.invoke("echo", &Map::new()).await;

        assert!(matches!(result, Err(ToolError::MissingParameter { .. })));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("nope", &Map::new()).await;
        assert_eq!(result, Err(ToolError::not_found("nope")));
    }

    #[test]
    fn test_duplicate_registration_and_declarations() {
        let mut registry = registry(Arc::new(EchoTool {
            calls: AtomicUsize::new(0),
        }));
        assert!(!registry.register(Arc::new(PingTool)));
        assert_eq!(registry.len(), 2);

        let declarations = registry.declarations();
        assert_eq!(declarations[0].name, "echo");
        assert!(declarations[0].parameters.is_some());
        assert_eq!(declarations[1].name, "ping");
        assert!(declarations[1].parameters.is_none());
    }
}

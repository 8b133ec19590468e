// ABOUTME: Public routes: API greeting and the application chat test
// ABOUTME: The chat test runs the agent on the application's own information without tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::errors::AppError;
use crate::models::{ChatTestRequest, MessageResponse};
use crate::resources::ServerResources;

/// Greeting and public chat routes
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all public chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/", get(Self::handle_hello))
            .route("/chat/test", post(Self::handle_chat_test))
            .with_state(resources)
    }

    async fn handle_hello(State(resources): State<Arc<ServerResources>>) -> String {
        format!("Hello from {} API!", resources.config.app.name)
    }

    async fn handle_chat_test(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<ChatTestRequest>,
    ) -> Result<Json<MessageResponse>, AppError> {
        Ok(Json(resources.businesses.app_chat_test(request).await?))
    }
}

// ABOUTME: Business routes: onboarding a page, settings, catalog sheets and chat tests
// ABOUTME: Every handler is scoped to businesses owned by the authenticated user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::errors::AppError;
use crate::middleware::AuthenticatedSession;
use crate::models::{BusinessUpdate, ChatTestRequest, MessageResponse};
use crate::providers::SheetTable;
use crate::resources::ServerResources;
use crate::services::{BusinessInfo, CreateBusinessRequest};

/// Business routes
pub struct BusinessRoutes;

impl BusinessRoutes {
    /// Create all business routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/businesses", get(Self::handle_list))
            .route("/business/create", post(Self::handle_create))
            .route("/business/:uid", get(Self::handle_get))
            .route("/business/:uid/update", post(Self::handle_update))
            .route("/business/:uid/products", get(Self::handle_products))
            .route("/business/:uid/orders", get(Self::handle_orders))
            .route("/business/:uid/chat/test", post(Self::handle_chat_test))
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
    ) -> Result<Json<Vec<BusinessInfo>>, AppError> {
        Ok(Json(resources.businesses.list(&claims.uid).await?))
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Json(request): Json<CreateBusinessRequest>,
    ) -> Result<Json<BusinessInfo>, AppError> {
        Ok(Json(resources.businesses.create(&claims.uid, request).await?))
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Path(uid): Path<String>,
    ) -> Result<Json<BusinessInfo>, AppError> {
        Ok(Json(resources.businesses.get(&claims.uid, &uid).await?))
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Path(uid): Path<String>,
        Json(update): Json<BusinessUpdate>,
    ) -> Result<Json<BusinessInfo>, AppError> {
        Ok(Json(
            resources.businesses.update(&claims.uid, &uid, update).await?,
        ))
    }

    async fn handle_products(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Path(uid): Path<String>,
    ) -> Result<Json<SheetTable>, AppError> {
        Ok(Json(resources.businesses.products(&claims.uid, &uid).await?))
    }

    async fn handle_orders(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Path(uid): Path<String>,
    ) -> Result<Json<SheetTable>, AppError> {
        Ok(Json(resources.businesses.orders(&claims.uid, &uid).await?))
    }

    async fn handle_chat_test(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Path(uid): Path<String>,
        Json(request): Json<ChatTestRequest>,
    ) -> Result<Json<MessageResponse>, AppError> {
        let reply = resources
            .businesses
            .chat_test(&claims.uid, &uid, request)
            .await?;
        Ok(Json(reply))
    }
}

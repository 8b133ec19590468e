// ABOUTME: Account routes: profile, managed Facebook pages and Google Sheets connection
// ABOUTME: Thin handlers over UserService scoped to the authenticated session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::errors::AppError;
use crate::middleware::AuthenticatedSession;
use crate::providers::GoogleUser;
use crate::resources::ServerResources;
use crate::services::{UserPages, UserProfile};

/// Query of `GET /user/facebook/pages`
#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    /// Return only this page
    pub id: Option<String>,
}

/// Body of `POST /user/connect/google/sheets`
#[derive(Debug, Deserialize)]
pub struct ConnectGoogleRequest {
    /// Authorization code from the Google consent screen
    #[serde(default)]
    pub code: String,
}

/// Account routes
pub struct UserRoutes;

impl UserRoutes {
    /// Create all account routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/user", get(Self::handle_profile))
            .route("/user/facebook/pages", get(Self::handle_facebook_pages))
            .route("/user/connect/google/sheets", post(Self::handle_connect_google))
            .with_state(resources)
    }

    async fn handle_profile(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
    ) -> Result<Json<UserProfile>, AppError> {
        let profile = resources.users.profile(&claims.uid, claims.platform).await?;
        Ok(Json(profile))
    }

    async fn handle_facebook_pages(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Query(query): Query<PagesQuery>,
    ) -> Result<Json<UserPages>, AppError> {
        let page_id = query.id.as_deref().filter(|id| !id.is_empty());
        let pages = resources.users.facebook_pages(&claims.uid, page_id).await?;
        Ok(Json(pages))
    }

    async fn handle_connect_google(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
        Json(request): Json<ConnectGoogleRequest>,
    ) -> Result<Json<GoogleUser>, AppError> {
        let user = resources
            .users
            .connect_google(&claims.uid, &request.code)
            .await?;
        Ok(Json(user))
    }
}

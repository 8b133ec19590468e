// ABOUTME: Authentication routes: Facebook login minting the session cookie, and logout
// ABOUTME: Login exchanges the Facebook token, then signs a keepToken session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{Platform, SessionClaims};
use crate::errors::AppError;
use crate::logging::AppLogger;
use crate::middleware::AuthenticatedSession;
use crate::providers::FacebookUser;
use crate::resources::ServerResources;
use crate::security::cookies::append_set_cookie;

/// Query of `POST /login/facebook`
#[derive(Debug, Deserialize)]
pub struct FacebookLoginQuery {
    /// Short-lived Facebook user token from the client SDK
    #[serde(default)]
    pub token: String,
}

/// Body of a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Account id
    pub uid: String,
    /// Facebook profile
    pub facebook: FacebookUser,
}

/// Login and logout routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/login/facebook", post(Self::handle_facebook_login))
            .route("/logout", post(Self::handle_logout))
            .with_state(resources)
    }

    async fn handle_facebook_login(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<FacebookLoginQuery>,
    ) -> Result<Response, AppError> {
        let login = resources.users.login_with_facebook(&query.token).await?;

        // The credential was just exchanged, so the first renewal only re-signs it
        let claims = SessionClaims::new(
            login.uid.as_str(),
            Platform::Facebook,
            login.credential.access_token.as_str(),
            login.credential.expires_at,
        )
        .keep_token();
        let (_, cookie) = resources.guard.issue(claims, Utc::now())?;
        AppLogger::log_session_event(Some(&login.uid), "login", true, "facebook");

        let mut response = Json(LoginResponse {
            uid: login.uid,
            facebook: login.facebook,
        })
        .into_response();
        append_set_cookie(response.headers_mut(), &cookie);
        Ok(response)
    }

    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        AuthenticatedSession(claims): AuthenticatedSession,
    ) -> Response {
        AppLogger::log_session_event(Some(&claims.uid), "logout", true, "cookie cleared");
        let mut response = Json(true).into_response();
        append_set_cookie(response.headers_mut(), &resources.guard.logout_cookie());
        response
    }
}

// ABOUTME: Scheduled credential refresh endpoints for Facebook and Google tokens
// ABOUTME: Optionally protected by the x-cron-secret header when CRON_SECRET is set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::resources::ServerResources;
use crate::services::{FacebookSweep, SweepReport};

/// Header carrying the cron shared secret
const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Token sweep routes
pub struct CronRoutes;

impl CronRoutes {
    /// Create the sweep routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/cronjob/refresh/facebook/tokens",
                get(Self::handle_facebook_tokens),
            )
            .route(
                "/cronjob/refresh/google/tokens",
                get(Self::handle_google_tokens),
            )
            .with_state(resources)
    }

    async fn handle_facebook_tokens(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<FacebookSweep>, AppError> {
        Self::authorize(&resources, &headers)?;
        Ok(Json(resources.sweeper.sweep_facebook(Utc::now()).await?))
    }

    async fn handle_google_tokens(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<SweepReport>, AppError> {
        Self::authorize(&resources, &headers)?;
        Ok(Json(resources.sweeper.sweep_google(Utc::now()).await?))
    }

    fn authorize(resources: &ServerResources, headers: &HeaderMap) -> AppResult<()> {
        let Some(expected) = resources.config.cron_secret.as_deref() else {
            return Ok(());
        };
        let provided = headers
            .get(CRON_SECRET_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided == Some(expected) {
            Ok(())
        } else {
            AppLogger::log_security_event(
                "cron_secret_mismatch",
                "medium",
                "sweep request rejected",
            );
            Err(AppError::auth_invalid("Invalid cron secret"))
        }
    }
}

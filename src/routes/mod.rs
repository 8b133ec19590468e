// ABOUTME: Route module organization for the Algecom HTTP API
// ABOUTME: Mounts every route group under /v1 behind the session guard and response envelope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Route module for the Algecom server
//!
//! Each domain module contains only route definitions and thin handlers that
//! delegate to the services in [`ServerResources`].
//!
//! Layers, outermost first:
//! 1. CORS
//! 2. request body limit
//! 3. request tracing
//! 4. session guard
//! 5. response envelope

/// Login and logout
pub mod auth;
/// Business management and business chat tests
pub mod businesses;
/// Public chat test and greeting
pub mod chat;
/// Credential refresh sweeps
pub mod cronjob;
/// Account profile and connections
pub mod users;
/// Facebook Messenger webhook
pub mod webhook;

pub use auth::AuthRoutes;
pub use businesses::BusinessRoutes;
pub use chat::ChatRoutes;
pub use cronjob::CronRoutes;
pub use users::UserRoutes;
pub use webhook::WebhookRoutes;

use std::sync::Arc;

use axum::body::Body;
use axum::{middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::limits::MAX_BODY_BYTES;
use crate::constants::routes::API_PREFIX;
use crate::middleware::{
    create_request_span, envelope_middleware, session_guard_middleware, setup_cors,
};
use crate::resources::ServerResources;

/// Build the complete application router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let api = Router::new()
        .merge(ChatRoutes::routes(resources.clone()))
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(UserRoutes::routes(resources.clone()))
        .merge(BusinessRoutes::routes(resources.clone()))
        .merge(WebhookRoutes::routes(resources.clone()))
        .merge(CronRoutes::routes(resources.clone()));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn(envelope_middleware))
        .layer(middleware::from_fn_with_state(
            resources.guard.clone(),
            session_guard_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(create_request_span::<Body>))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(setup_cors(&resources.config))
}

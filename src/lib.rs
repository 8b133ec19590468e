// ABOUTME: Main library entry point for the Algecom AI sales agent backend
// ABOUTME: Connects Facebook pages, Google Sheets catalogs and Gemini behind a session-guarded API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

// Crate-level attributes:
// - recursion_limit: raised for the nested serde derives on the wire types
// - deny(unsafe_code): zero-tolerance unsafe policy
#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Algecom Server
//!
//! Backend for an AI sales agent that answers customers on a business's
//! Facebook page, reading the catalog and recording orders in a Google
//! spreadsheet.
//!
//! ## Features
//!
//! - **Facebook login**: cookie sessions with sliding renewal of the embedded token
//! - **Messenger webhook**: page messages answered by the business's agent
//! - **Tool calling**: bounded Gemini round-trips over a validated tool registry
//! - **Credential refresh**: reactive refresh on auth failure plus scheduled sweeps
//!
//! ## Architecture
//!
//! - **Providers**: Facebook Graph and Google Sheets clients
//! - **`OAuth2` client**: credential store, refresher and refresh-on-failure wrapper
//! - **Conversation**: the tool-calling loop over a [`llm::GenerativeModel`]
//! - **Services**: user and business operations used by the routes
//! - **Routes**: axum handlers behind the session guard and response envelope
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use algecom_server::config::ServerConfig;
//! use algecom_server::resources::ServerResources;
//! use algecom_server::routes::build_router;
//!
//! fn app() -> anyhow::Result<axum::Router> {
//!     let config = ServerConfig::from_env()?;
//!     Ok(build_router(Arc::new(ServerResources::from_config(config))))
//! }
//! ```

/// Session token claims and signing
pub mod auth;

/// Configuration management
pub mod config;

/// Application constants
pub mod constants;

/// Tool-calling conversation engine
pub mod conversation;

/// Repositories for users, businesses and page conversations
pub mod database;

/// Unified error handling
pub mod errors;

/// Generative model interface and Gemini client
pub mod llm;

/// Logging configuration and structured logging helpers
pub mod logging;

/// HTTP middleware: session guard, envelope, CORS and tracing
pub mod middleware;

/// Domain models
pub mod models;

/// Provider credentials and refresh-on-auth-failure calls
pub mod oauth2_client;

/// Facebook and Google clients
pub mod providers;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;

/// Cookie handling
pub mod security;

/// Domain services
pub mod services;

/// Business tools callable by the model
pub mod tools;

/// HTTP client helpers
pub mod utils;

// ABOUTME: OAuth 2.0 client plumbing for third-party provider credentials
// ABOUTME: Credential store, auth-failure matching and the refresh-once-and-retry wrapper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # OAuth 2.0 Client Module
//!
//! The server acts as an OAuth 2.0 client of Google and Facebook on behalf of
//! its users. This module handles:
//! - authorization-code exchange and token refresh
//! - credential persistence
//! - classification of provider responses that mean "token rejected"
//! - transparent refresh and single retry of provider calls
//! - serialized rotation per principal and provider

/// Authorization-code and refresh-token grants
pub mod client;
/// Credential model and store
pub mod credentials;
/// Authorization failure classification
pub mod matcher;
/// Refresh-once-and-retry wrapper
pub mod refreshing;
/// Keyed refresh-and-persist shared across callers
pub mod rotation;

pub use client::{OAuth2Client, OAuth2Config};
pub use credentials::{Credential, CredentialKey, CredentialStore, InMemoryCredentialStore};
pub use matcher::{AuthFailureMatcher, PhraseAuthFailureMatcher};
pub use refreshing::{CredentialRefresher, RefreshingClient};
pub use rotation::{CredentialRotator, RotateError};

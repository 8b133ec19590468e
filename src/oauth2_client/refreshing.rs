// ABOUTME: Wraps provider calls with refresh-once-and-retry on authorization failure
// ABOUTME: Rotation goes through the shared CredentialRotator, one refresh per key at a time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Refreshing Client
//!
//! Every bearer call to a third-party API goes through [`RefreshingClient::call`].
//! When the provider rejects the credential the client refreshes it at most
//! once, persists the rotated credential through the [`CredentialStore`] and
//! retries the operation exactly once.
//!
//! Refreshes for the same principal and provider are serialized by the shared
//! [`CredentialRotator`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use super::credentials::{Credential, CredentialKey, CredentialStore};
use super::matcher::AuthFailureMatcher;
use super::rotation::{CredentialRotator, RotateError};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::providers::errors::ProviderCallError;

/// Obtains a new credential from the provider
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Exchange the current credential for a fresh one
    ///
    /// Implementations that rotate via a refresh token may assume
    /// `credential.refresh_token` is present.
    async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderCallError>;
}

/// Provider call wrapper with refresh-once-and-retry semantics
#[derive(Clone)]
pub struct RefreshingClient {
    provider: &'static str,
    rotator: Arc<CredentialRotator>,
    matcher: Arc<dyn AuthFailureMatcher>,
    call_timeout: Duration,
}

impl RefreshingClient {
    /// Create a client rotating credentials through the shared `rotator`
    #[must_use]
    pub fn new(
        provider: &'static str,
        rotator: Arc<CredentialRotator>,
        matcher: Arc<dyn AuthFailureMatcher>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            rotator,
            matcher,
            call_timeout,
        }
    }

    /// Store rotated credentials are written to
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.rotator.store()
    }

    /// Run `op` with `credential`, refreshing and retrying once on authorization failure
    ///
    /// # Errors
    ///
    /// - the original error mapped to `AppError` when it is not an authorization failure
    /// - `RefreshTokenMissing` when the credential cannot be refreshed
    /// - `AuthExhausted` when the refresh fails or the retry is rejected again
    /// - `UpstreamTimeout` when a call exceeds the configured timeout
    #[instrument(skip(self, key, credential, refresher, op), fields(key = %key))]
    pub async fn call<T, Op, Fut>(
        &self,
        key: &CredentialKey,
        credential: Credential,
        refresher: &dyn CredentialRefresher,
        op: Op,
    ) -> AppResult<T>
    where
        Op: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T, ProviderCallError>>,
    {
        let original = match self.timed(op(credential.clone())).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !self.matcher.is_auth_failure(&original) {
            return Err(AppError::from(original).with_principal(&key.principal_id));
        }

        warn!(provider = %key.provider_key, "provider rejected credential: {original}");

        if !credential.can_refresh() {
            AppLogger::log_oauth_event(&key.principal_id, &key.provider_key, "refresh", false);
            return Err(AppError::refresh_token_missing(&key.provider_key)
                .with_principal(&key.principal_id)
                .with_source(original));
        }

        let fresh = match self.rotator.rotate(key, &credential, refresher).await {
            Ok(fresh) => fresh,
            Err(RotateError::Timeout { timeout_secs }) => {
                AppLogger::log_oauth_event(&key.principal_id, &key.provider_key, "refresh", false);
                return Err(AppError::upstream_timeout(self.provider, timeout_secs)
                    .with_principal(&key.principal_id));
            }
            Err(refresh_error) => {
                AppLogger::log_oauth_event(&key.principal_id, &key.provider_key, "refresh", false);
                return Err(AppError::auth_exhausted(original.message())
                    .with_principal(&key.principal_id)
                    .with_resource_id(&key.provider_key)
                    .with_source(refresh_error));
            }
        };

        match self.timed(op(fresh)).await {
            Ok(value) => Ok(value),
            Err(retry_error) if self.matcher.is_auth_failure(&retry_error) => {
                Err(AppError::auth_exhausted(original.message())
                    .with_principal(&key.principal_id)
                    .with_resource_id(&key.provider_key)
                    .with_source(retry_error))
            }
            Err(retry_error) => Err(AppError::from(retry_error).with_principal(&key.principal_id)),
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, ProviderCallError>
    where
        F: Future<Output = Result<T, ProviderCallError>>,
    {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderCallError::Timeout {
                    provider: self.provider,
                    timeout_secs: self.call_timeout.as_secs(),
                })
            })
    }
}

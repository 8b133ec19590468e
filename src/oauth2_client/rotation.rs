// ABOUTME: Serialized refresh-and-persist of provider credentials keyed by principal and provider
// ABOUTME: Shared by the refreshing client, the session guard and the token sweep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Credential Rotation
//!
//! Only one refresh per `(principal, provider)` runs at a time. A caller that
//! waited on the key re-reads the store and reuses the credential another
//! caller already rotated instead of refreshing a second time.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::credentials::{Credential, CredentialKey, CredentialStore};
use super::refreshing::CredentialRefresher;
use crate::errors::AppError;
use crate::logging::AppLogger;
use crate::providers::errors::ProviderCallError;

/// Why a rotation did not yield a usable credential
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    /// Provider rejected the refresh
    #[error("refresh rejected: {0}")]
    Provider(ProviderCallError),
    /// Refresh exceeded its time budget
    #[error("refresh did not complete within {timeout_secs}s")]
    Timeout {
        /// Budget that was exceeded
        timeout_secs: u64,
    },
    /// Rotated credential could not be read or written
    #[error("credential store failed: {0}")]
    Store(AppError),
}

/// Keyed refresh-and-persist over a [`CredentialStore`]
pub struct CredentialRotator {
    store: Arc<dyn CredentialStore>,
    locks: DashMap<CredentialKey, Arc<Mutex<()>>>,
    refresh_timeout: Duration,
}

impl CredentialRotator {
    /// Rotate credentials held in `store`, bounding each refresh by `refresh_timeout`
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, refresh_timeout: Duration) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            refresh_timeout,
        }
    }

    /// Store rotated credentials are written to
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Keys with a rotation in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    /// Replace `stale` with a fresh credential and persist it
    ///
    /// Returns the stored credential unchanged when it differs from `stale`
    /// and outlives it, since a concurrent caller already rotated it.
    ///
    /// # Errors
    ///
    /// - `Provider` when the refresher fails
    /// - `Timeout` when the refresher exceeds the budget
    /// - `Store` when the store cannot be read or written
    #[instrument(skip(self, stale, refresher), fields(key = %key))]
    pub async fn rotate(
        &self,
        key: &CredentialKey,
        stale: &Credential,
        refresher: &dyn CredentialRefresher,
    ) -> Result<Credential, RotateError> {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let rotated = {
            let _guard = lock.lock().await;
            self.rotate_locked(key, stale, refresher).await
        };

        drop(lock);
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);

        rotated
    }

    async fn rotate_locked(
        &self,
        key: &CredentialKey,
        stale: &Credential,
        refresher: &dyn CredentialRefresher,
    ) -> Result<Credential, RotateError> {
        if let Some(current) = self.store.load(key).await.map_err(RotateError::Store)? {
            if current.access_token != stale.access_token
                && current.expires_at > stale.expires_at
            {
                debug!("credential already rotated by a concurrent call");
                return Ok(current);
            }
        }

        let mut fresh = tokio::time::timeout(self.refresh_timeout, refresher.refresh(stale))
            .await
            .map_err(|_| RotateError::Timeout {
                timeout_secs: self.refresh_timeout.as_secs(),
            })?
            .map_err(RotateError::Provider)?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token.clone_from(&stale.refresh_token);
        }

        self.store
            .persist(key, fresh.clone())
            .await
            .map_err(RotateError::Store)?;
        AppLogger::log_oauth_event(&key.principal_id, &key.provider_key, "refresh", true);

        Ok(fresh)
    }
}

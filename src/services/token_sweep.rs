// ABOUTME: Batch refresh of stored credentials that are about to expire
// ABOUTME: Triggered by an external cron through the cronjob endpoints; reports per-table results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::constants::oauth::{FACEBOOK_REFRESH_WINDOW_SECS, GOOGLE_REFRESH_WINDOW_SECS};
use crate::constants::providers;
use crate::errors::AppResult;
use crate::logging::AppLogger;
use crate::oauth2_client::{CredentialRefresher, CredentialRotator, CredentialStore};

/// Outcome of refreshing one credential table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// Table name
    pub table: String,
    /// Credentials inside the refresh window
    pub total: usize,
    /// Principals refreshed
    pub updated: Vec<String>,
    /// Principals whose refresh failed
    pub failed: Vec<String>,
    /// `updated / total * 100`, zero for an empty table
    pub percentage: f64,
}

impl SweepReport {
    fn new(table: &str, total: usize) -> Self {
        Self {
            table: table.to_owned(),
            total,
            updated: Vec::new(),
            failed: Vec::new(),
            percentage: 0.0,
        }
    }

    fn finish(mut self) -> Self {
        if self.total > 0 {
            self.percentage = self.updated.len() as f64 / self.total as f64 * 100.0;
        }
        self
    }
}

/// Result of the Facebook sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacebookSweep {
    /// User tokens
    pub facebook_users: SweepReport,
    /// Page tokens
    pub facebook_pages: SweepReport,
}

/// Refreshes stored credentials ahead of expiry
pub struct TokenSweeper {
    rotator: Arc<CredentialRotator>,
    facebook: Arc<dyn CredentialRefresher>,
    google: Arc<dyn CredentialRefresher>,
}

impl TokenSweeper {
    /// Create a sweeper refreshing through the given providers
    #[must_use]
    pub fn new(
        rotator: Arc<CredentialRotator>,
        facebook: Arc<dyn CredentialRefresher>,
        google: Arc<dyn CredentialRefresher>,
    ) -> Self {
        Self {
            rotator,
            facebook,
            google,
        }
    }

    /// Refresh Facebook user and page tokens expiring within ten days
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be listed
    pub async fn sweep_facebook(&self, now: DateTime<Utc>) -> AppResult<FacebookSweep> {
        let window = Duration::seconds(FACEBOOK_REFRESH_WINDOW_SECS);
        Ok(FacebookSweep {
            facebook_users: self
                .sweep("facebook_users", providers::FACEBOOK, window, self.facebook.as_ref(), now)
                .await?,
            facebook_pages: self
                .sweep(
                    "facebook_pages",
                    providers::FACEBOOK_PAGE,
                    window,
                    self.facebook.as_ref(),
                    now,
                )
                .await?,
        })
    }

    /// Refresh Google tokens expiring within ten minutes
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be listed
    pub async fn sweep_google(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        self.sweep(
            "google_sheets",
            providers::GOOGLE,
            Duration::seconds(GOOGLE_REFRESH_WINDOW_SECS),
            self.google.as_ref(),
            now,
        )
        .await
    }

    #[instrument(skip(self, refresher, now))]
    async fn sweep(
        &self,
        table: &str,
        provider_key: &str,
        window: Duration,
        refresher: &dyn CredentialRefresher,
        now: DateTime<Utc>,
    ) -> AppResult<SweepReport> {
        let expiring = self
            .rotator
            .store()
            .list_expiring(provider_key, now + window)
            .await?;
        let mut report = SweepReport::new(table, expiring.len());

        for (key, stale) in expiring {
            let refreshed = self.rotator.rotate(&key, &stale, refresher).await;
            if let Err(e) = &refreshed {
                warn!(principal = %key.principal_id, "refresh failed: {e}");
            }

            AppLogger::log_oauth_event(&key.principal_id, provider_key, "sweep", refreshed.is_ok());
            if refreshed.is_ok() {
                report.updated.push(key.principal_id);
            } else {
                report.failed.push(key.principal_id);
            }
        }

        let report = report.finish();
        info!(
            table,
            total = report.total,
            updated = report.updated.len(),
            failed = report.failed.len(),
            "token sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2_client::{Credential, CredentialKey, InMemoryCredentialStore};
    use std::time::Duration as StdDuration;
    use crate::providers::ProviderCallError;
    use async_trait::async_trait;

    struct FlakyRefresher;

    #[async_trait]
    impl CredentialRefresher for FlakyRefresher {
        async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderCallError> {
            if credential.access_token == "bad" {
                return Err(ProviderCallError::ApiError {
                    provider: "google",
                    status_code: 400,
                    message: "invalid_grant".to_owned(),
                    error_code: None,
                });
            }
            Ok(Credential::new(
                &credential.provider_key,
                format!("{}-new", credential.access_token),
                Utc::now() + Duration::hours(1),
            ))
        }
    }

    fn sweeper(store: Arc<InMemoryCredentialStore>) -> TokenSweeper {
        TokenSweeper::new(
            Arc::new(CredentialRotator::new(store, StdDuration::from_secs(5))),
            Arc::new(FlakyRefresher),
            Arc::new(FlakyRefresher),
        )
    }

    #[tokio::test]
    async fn test_google_sweep_reports_and_persists() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let now = Utc::now();
        let soon = now + Duration::minutes(5);
        store
            .persist(
                &CredentialKey::new("u1", providers::GOOGLE),
                Credential::new(providers::GOOGLE, "good", soon).with_refresh_token("r1"),
            )
            .await
            .unwrap();
        store
            .persist(
                &CredentialKey::new("u2", providers::GOOGLE),
                Credential::new(providers::GOOGLE, "bad", soon).with_refresh_token("r2"),
            )
            .await
            .unwrap();
        store
            .persist(
                &CredentialKey::new("u3", providers::GOOGLE),
                Credential::new(providers::GOOGLE, "later", now + Duration::hours(2)),
            )
            .await
            .unwrap();

        let sweeper = sweeper(store.clone());
        let report = sweeper.sweep_google(now).await.unwrap();

        assert_eq!(report.table, "google_sheets");
        assert_eq!(report.total, 2);
        assert_eq!(report.updated, vec!["u1".to_owned()]);
        assert_eq!(report.failed, vec!["u2".to_owned()]);
        assert!((report.percentage - 50.0).abs() < f64::EPSILON);

        let stored = store
            .load(&CredentialKey::new("u1", providers::GOOGLE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "good-new");
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_empty_sweep_has_zero_percentage() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let sweeper = sweeper(store);
        let sweep = sweeper.sweep_facebook(Utc::now()).await.unwrap();
        assert_eq!(sweep.facebook_users.total, 0);
        assert!(sweep.facebook_pages.percentage.abs() < f64::EPSILON);
    }
}

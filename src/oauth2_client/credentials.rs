// ABOUTME: Provider credential model and the store that persists rotated credentials
// ABOUTME: In-memory DashMap implementation keyed by principal and provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;

/// Access token issued by a third-party provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token presented to the provider
    pub access_token: String,
    /// Token used to obtain a new access token, when the provider issues one
    pub refresh_token: Option<String>,
    /// Expiry of the access token
    pub expires_at: DateTime<Utc>,
    /// Provider the credential belongs to (`facebook`, `facebook_page`, `google`)
    pub provider_key: String,
}

impl Credential {
    /// Create a credential without a refresh token
    #[must_use]
    pub fn new(
        provider_key: impl Into<String>,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at,
            provider_key: provider_key.into(),
        }
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Time left before expiry; negative once expired
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Whether the credential expires within `window` of `now`
    #[must_use]
    pub fn expires_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + window
    }

    /// Whether a refresh token is available
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("provider_key", &self.provider_key)
            .finish()
    }
}

/// Identity of a stored credential
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    /// Owner of the credential (user uid or page id)
    pub principal_id: String,
    /// Provider key
    pub provider_key: String,
}

impl CredentialKey {
    /// Build a key
    #[must_use]
    pub fn new(principal_id: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            provider_key: provider_key.into(),
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_key, self.principal_id)
    }
}

/// Persistence for provider credentials
///
/// `persist` is the hook called whenever a credential is rotated; it must
/// replace the stored value atomically so readers never observe a torn write.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential for a principal and provider
    async fn load(&self, key: &CredentialKey) -> AppResult<Option<Credential>>;

    /// Store a new or rotated credential
    async fn persist(&self, key: &CredentialKey, credential: Credential) -> AppResult<()>;

    /// Credentials of one provider expiring at or before `before`
    async fn list_expiring(
        &self,
        provider_key: &str,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<(CredentialKey, Credential)>>;
}

/// `DashMap` backed credential store
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: DashMap<CredentialKey, Credential>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, key: &CredentialKey) -> AppResult<Option<Credential>> {
        Ok(self.credentials.get(key).map(|entry| entry.value().clone()))
    }

    async fn persist(&self, key: &CredentialKey, credential: Credential) -> AppResult<()> {
        self.credentials.insert(key.clone(), credential);
        Ok(())
    }

    async fn list_expiring(
        &self,
        provider_key: &str,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<(CredentialKey, Credential)>> {
        Ok(self
            .credentials
            .iter()
            .filter(|entry| entry.key().provider_key == provider_key)
            .filter(|entry| entry.value().expires_at <= before)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_expiring_filters_by_provider_and_window() {
        let store = InMemoryCredentialStore::new();
        let now = Utc::now();

        let soon = CredentialKey::new("u1", "google");
        let later = CredentialKey::new("u2", "google");
        let other = CredentialKey::new("u1", "facebook");

        store
            .persist(&soon, Credential::new("google", "a", now + Duration::minutes(5)))
            .await
            .unwrap();
        store
            .persist(&later, Credential::new("google", "b", now + Duration::hours(2)))
            .await
            .unwrap();
        store
            .persist(&other, Credential::new("facebook", "c", now + Duration::minutes(1)))
            .await
            .unwrap();

        let expiring = store
            .list_expiring("google", now + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].0, soon);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential =
            Credential::new("google", "ya29.secret", Utc::now()).with_refresh_token("1//refresh");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("ya29.secret"));
        assert!(!rendered.contains("1//refresh"));
        assert!(credential.can_refresh());
    }

    #[test]
    fn test_remaining_is_negative_after_expiry() {
        let now = Utc::now();
        let credential = Credential::new("facebook", "t", now - Duration::seconds(5));
        assert!(credential.remaining(now) <= Duration::zero());
        assert!(credential.expires_within(Duration::zero(), now));
    }
}

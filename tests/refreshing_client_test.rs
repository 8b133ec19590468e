// ABOUTME: Integration tests for refresh-once-and-retry provider calls
// ABOUTME: Verifies single refresh, persistence, exhaustion, missing refresh tokens and timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use algecom_server::errors::ErrorCode;
use algecom_server::oauth2_client::{
    Credential, CredentialKey, CredentialRefresher, CredentialRotator, CredentialStore,
    InMemoryCredentialStore, PhraseAuthFailureMatcher, RefreshingClient,
};
use algecom_server::providers::ProviderCallError;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use common::init_test_logging;

const PROVIDER: &str = "Google Sheets";

/// Refresher handing out `fresh-token-N`
#[derive(Default)]
struct CountingRefresher {
    calls: AtomicUsize,
}

#[async_trait]
impl CredentialRefresher for CountingRefresher {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderCallError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(
            credential.provider_key.clone(),
            format!("fresh-token-{n}"),
            Utc::now() + ChronoDuration::hours(1),
        ))
    }
}

fn unauthorized() -> ProviderCallError {
    ProviderCallError::ApiError {
        provider: PROVIDER,
        status_code: 401,
        message: "Request had invalid authentication credentials".to_owned(),
        error_code: None,
    }
}

fn stale_credential() -> Credential {
    Credential::new("google", "stale-token", Utc::now() + ChronoDuration::minutes(5))
        .with_refresh_token("refresh-1")
}

async fn setup(
    credential: &Credential,
) -> (Arc<InMemoryCredentialStore>, RefreshingClient, CredentialKey) {
    setup_with_timeout(credential, Duration::from_secs(5)).await
}

async fn setup_with_timeout(
    credential: &Credential,
    timeout: Duration,
) -> (Arc<InMemoryCredentialStore>, RefreshingClient, CredentialKey) {
    init_test_logging();
    let store = Arc::new(InMemoryCredentialStore::new());
    let key = CredentialKey::new("user-1", "google");
    store.persist(&key, credential.clone()).await.unwrap();
    let rotator = Arc::new(CredentialRotator::new(store.clone(), timeout));
    let client = RefreshingClient::new(
        PROVIDER,
        rotator,
        Arc::new(PhraseAuthFailureMatcher::new()),
        timeout,
    );
    (store, client, key)
}

#[tokio::test]
async fn test_auth_failure_refreshes_once_and_retries() {
    let credential = stale_credential();
    let (store, client, key) = setup(&credential).await;
    let refresher = CountingRefresher::default();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let result = client
        .call(&key, credential, &refresher, |cred: Credential| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(cred.access_token.clone());
                if cred.access_token == "stale-token" {
                    Err(unauthorized())
                } else {
                    Ok("values")
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "values");
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["stale-token".to_owned(), "fresh-token-1".to_owned()]
    );

    let persisted = store.load(&key).await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "fresh-token-1");
    // Provider did not rotate the refresh token, the old one is kept
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_retry_rejected_again_is_exhausted() {
    let credential = stale_credential();
    let (_store, client, key) = setup(&credential).await;
    let refresher = CountingRefresher::default();
    let attempts = AtomicUsize::new(0);

    let error = client
        .call(&key, credential, &refresher, |_cred: Credential| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(unauthorized()) }
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::AuthExhausted);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_refresh_token_never_calls_refresher() {
    let credential = Credential::new("google", "stale-token", Utc::now());
    let (_store, client, key) = setup(&credential).await;
    let refresher = CountingRefresher::default();

    let error = client
        .call(&key, credential, &refresher, |_cred: Credential| async {
            Err::<(), _>(unauthorized())
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::RefreshTokenMissing);
    assert_eq!(error.http_status(), 401);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_auth_failure_passes_through() {
    let credential = stale_credential();
    let (store, client, key) = setup(&credential).await;
    let refresher = CountingRefresher::default();

    let error = client
        .call(&key, credential, &refresher, |_cred: Credential| async {
            Err::<(), _>(ProviderCallError::ApiError {
                provider: PROVIDER,
                status_code: 404,
                message: "Requested entity was not found".to_owned(),
                error_code: None,
            })
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::ExternalServiceError);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        store.load(&key).await.unwrap().unwrap().access_token,
        "stale-token"
    );
}

#[tokio::test]
async fn test_phrase_in_message_counts_as_auth_failure() {
    let credential = stale_credential();
    let (_store, client, key) = setup(&credential).await;
    let refresher = CountingRefresher::default();

    let result = client
        .call(&key, credential, &refresher, |cred: Credential| async move {
            if cred.access_token == "stale-token" {
                Err(ProviderCallError::ApiError {
                    provider: PROVIDER,
                    status_code: 400,
                    message: "invalid_token".to_owned(),
                    error_code: None,
                })
            } else {
                Ok(cred.access_token)
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "fresh-token-1");
}

#[tokio::test]
async fn test_concurrently_rotated_credential_is_reused() {
    let credential = stale_credential();
    let (store, client, key) = setup(&credential).await;
    // Another caller already rotated the credential
    store
        .persist(
            &key,
            Credential::new("google", "rotated-elsewhere", Utc::now() + ChronoDuration::hours(1))
                .with_refresh_token("refresh-1"),
        )
        .await
        .unwrap();
    let refresher = CountingRefresher::default();

    let result = client
        .call(&key, credential, &refresher, |cred: Credential| async move {
            if cred.access_token == "stale-token" {
                Err(unauthorized())
            } else {
                Ok(cred.access_token)
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "rotated-elsewhere");
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
}

/// Refresher that never answers
struct StalledRefresher;

#[async_trait]
impl CredentialRefresher for StalledRefresher {
    async fn refresh(&self, _credential: &Credential) -> Result<Credential, ProviderCallError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_hanging_call_times_out() {
    let credential = stale_credential();
    let (_store, client, key) = setup_with_timeout(&credential, Duration::from_millis(50)).await;
    let refresher = CountingRefresher::default();

    let error = client
        .call(&key, credential, &refresher, |_cred: Credential| async {
            std::future::pending::<Result<(), ProviderCallError>>().await
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::UpstreamTimeout);
    assert!(error.is_retryable());
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hanging_refresh_times_out() {
    let credential = stale_credential();
    let (store, client, key) = setup_with_timeout(&credential, Duration::from_millis(50)).await;

    let error = client
        .call(&key, credential, &StalledRefresher, |_cred: Credential| async {
            Err::<(), _>(unauthorized())
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::UpstreamTimeout);
    assert_eq!(
        store.load(&key).await.unwrap().unwrap().access_token,
        "stale-token"
    );
}

// ABOUTME: Sliding-expiry session guard deciding per request to accept, renew or reject
// ABOUTME: Verifies the authToken cookie and appends a renewed cookie to the response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Session Guard
//!
//! Every request outside the public allow-list must carry a valid `authToken`
//! cookie. The decision depends on how long the credential embedded in the
//! session has left:
//!
//! - fully expired: the request is rejected
//! - more than the renewal threshold: accepted as-is, no `Set-Cookie`
//! - otherwise: renewed, and the new cookie is appended to the response
//!
//! Renewal exchanges the embedded credential through the platform's
//! [`CredentialRefresher`] unless the session was minted with `keepToken`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::auth::{Platform, SessionClaims, SessionSigner, SignedSession};
use crate::constants::providers;
use crate::constants::session::COOKIE_NAME;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::oauth2_client::{Credential, CredentialKey, CredentialRefresher, CredentialRotator};
use crate::security::cookies::{
    append_set_cookie, clear_session_cookie, get_cookie_value, session_cookie,
};

/// Paths reachable without a session
///
/// Entries are relative to a prefix and match exactly, or as a prefix when
/// they end in `*`.
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PublicRoutes {
    /// Build the allow-list for `entries` mounted under `prefix`
    #[must_use]
    pub fn new(prefix: &str, entries: &[&str]) -> Self {
        let mut routes = Self::default();
        for entry in entries {
            if let Some(stem) = entry.strip_suffix('*') {
                routes.prefixes.push(format!("{prefix}{stem}"));
            } else {
                routes.exact.push(format!("{prefix}{entry}"));
            }
        }
        routes
    }

    /// Whether `path` bypasses the guard
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        let normalized = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        self.exact.iter().any(|p| p == normalized)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Guard decision for one request
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// Allow-listed path; no session inspected
    Public,
    /// Valid session with enough credential lifetime left
    Accepted(SessionClaims),
    /// Valid session that was re-signed
    Renewed {
        /// Claims of the new session
        claims: SessionClaims,
        /// `Set-Cookie` value to append to the response
        cookie: String,
    },
}

/// Claims of the authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub SessionClaims);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(AppError::auth_required)
    }
}

/// Session verification and sliding renewal
pub struct SessionGuard {
    signer: SessionSigner,
    renewal_threshold: Duration,
    public: PublicRoutes,
    refreshers: HashMap<Platform, Arc<dyn CredentialRefresher>>,
    rotator: Arc<CredentialRotator>,
}

impl SessionGuard {
    /// Create a guard with no platform refreshers
    #[must_use]
    pub fn new(
        signer: SessionSigner,
        renewal_threshold_secs: i64,
        public: PublicRoutes,
        rotator: Arc<CredentialRotator>,
    ) -> Self {
        Self {
            signer,
            renewal_threshold: Duration::seconds(renewal_threshold_secs),
            public,
            refreshers: HashMap::new(),
            rotator,
        }
    }

    /// Exchange credentials of `platform` sessions through `refresher` on renewal
    #[must_use]
    pub fn with_refresher(
        mut self,
        platform: Platform,
        refresher: Arc<dyn CredentialRefresher>,
    ) -> Self {
        self.refreshers.insert(platform, refresher);
        self
    }

    /// Mint a session for a fresh login
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails
    pub fn issue(
        &self,
        claims: SessionClaims,
        now: DateTime<Utc>,
    ) -> AppResult<(SignedSession, String)> {
        let signed = self.signer.issue(claims, now)?;
        let cookie = session_cookie(&signed.token, signed.claims.exp - now.timestamp());
        Ok((signed, cookie))
    }

    /// Cookie that ends the session
    #[must_use]
    pub fn logout_cookie(&self) -> String {
        clear_session_cookie()
    }

    /// Decide whether the request at `path` may proceed
    ///
    /// # Errors
    ///
    /// Returns `SessionInvalid` when the cookie is missing, does not verify,
    /// carries a fully expired credential or cannot be renewed
    #[instrument(skip(self, headers, now), fields(uid = tracing::field::Empty))]
    pub async fn authorize(
        &self,
        path: &str,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> AppResult<GuardOutcome> {
        if self.public.is_public(path) {
            return Ok(GuardOutcome::Public);
        }

        let token = get_cookie_value(headers, COOKIE_NAME)
            .ok_or_else(|| AppError::session_invalid("Authentication required"))?;

        let claims = self.signer.verify(&token, now).map_err(|e| {
            AppLogger::log_session_event(None, "verify", false, &e.to_string());
            AppError::session_invalid(e.to_string()).with_source(e)
        })?;
        tracing::Span::current().record("uid", claims.uid.as_str());

        let remaining = claims.credential_remaining(now);
        if remaining <= Duration::zero() {
            AppLogger::log_session_event(Some(&claims.uid), "verify", false, "credential expired");
            return Err(
                AppError::session_invalid("Session has expired").with_principal(&claims.uid)
            );
        }

        if remaining > self.renewal_threshold {
            return Ok(GuardOutcome::Accepted(claims));
        }

        let (signed, cookie) = self.renew(claims, now).await?;
        Ok(GuardOutcome::Renewed {
            claims: signed.claims,
            cookie,
        })
    }

    async fn renew(
        &self,
        mut claims: SessionClaims,
        now: DateTime<Utc>,
    ) -> AppResult<(SignedSession, String)> {
        let refresher = self.refreshers.get(&claims.platform);

        match (claims.wants_keep_token(), refresher) {
            (false, Some(refresher)) => {
                let current = Credential::new(
                    providers::FACEBOOK,
                    claims.token.clone(),
                    DateTime::from_timestamp(claims.expires_at, 0).unwrap_or(now),
                );
                let key = CredentialKey::new(&claims.uid, providers::FACEBOOK);
                let fresh = self
                    .rotator
                    .rotate(&key, &current, refresher.as_ref())
                    .await
                    .map_err(|e| {
                        AppLogger::log_session_event(
                            Some(&claims.uid),
                            "renew",
                            false,
                            &e.to_string(),
                        );
                        AppError::session_invalid("Session renewal failed")
                            .with_principal(&claims.uid)
                            .with_source(e)
                    })?;

                claims.token = fresh.access_token;
                claims.expires_at = fresh.expires_at.timestamp();
            }
            _ => debug!(
                uid = %claims.uid,
                platform = %claims.platform,
                "re-signing session as-is"
            ),
        }
        claims.keep_token = None;

        let issued = self.issue(claims, now)?;
        AppLogger::log_session_event(
            Some(&issued.0.claims.uid),
            "renew",
            true,
            "session renewed",
        );
        Ok(issued)
    }
}

/// Axum middleware running [`SessionGuard::authorize`] before the handler
pub async fn session_guard_middleware(
    State(guard): State<Arc<SessionGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = guard
        .authorize(request.uri().path(), request.headers(), Utc::now())
        .await;

    match outcome {
        Ok(GuardOutcome::Public) => next.run(request).await,
        Ok(GuardOutcome::Accepted(claims)) => {
            request.extensions_mut().insert(AuthenticatedSession(claims));
            next.run(request).await
        }
        Ok(GuardOutcome::Renewed { claims, cookie }) => {
            request.extensions_mut().insert(AuthenticatedSession(claims));
            let mut response = next.run(request).await;
            append_set_cookie(response.headers_mut(), &cookie);
            response
        }
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::routes::{API_PREFIX, PUBLIC_ROUTES};

    #[test]
    fn test_public_routes_matching() {
        let routes = PublicRoutes::new(API_PREFIX, PUBLIC_ROUTES);

        assert!(routes.is_public("/v1"));
        assert!(routes.is_public("/v1/"));
        assert!(routes.is_public("/v1/login/facebook"));
        assert!(routes.is_public("/v1/chat/test"));
        assert!(routes.is_public("/v1/facebook/webhook"));
        assert!(routes.is_public("/v1/cronjob/refresh/google/tokens"));

        assert!(!routes.is_public("/v1/user"));
        assert!(!routes.is_public("/v1/business/abc/chat/test"));
        assert!(!routes.is_public("/v1/chat/test/extra"));
    }
}

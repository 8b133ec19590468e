// ABOUTME: OAuth2 authorization-code client used for the Google Sheets connection
// ABOUTME: Exchanges authorization codes and refreshes tokens into Credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::fmt;

use chrono::{Duration, Utc};
use serde::Deserialize;

use super::credentials::Credential;
use crate::constants::oauth::DEFAULT_TOKEN_EXPIRY_SECS;
use crate::providers::errors::ProviderCallError;
use crate::utils::http_client::{oauth_client, send_json};

/// OAuth 2.0 client configuration
#[derive(Clone)]
pub struct OAuth2Config {
    /// Provider key stamped on issued credentials
    pub provider_key: &'static str,
    /// Service name used in errors and logs
    pub service_name: &'static str,
    /// OAuth client ID from provider
    pub client_id: String,
    /// OAuth client secret from provider
    pub client_secret: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Redirect URI for OAuth callbacks
    pub redirect_uri: String,
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("provider_key", &self.provider_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// OAuth 2.0 client for the authorization-code and refresh-token grants
pub struct OAuth2Client {
    config: OAuth2Config,
    client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new `OAuth2` client with the given configuration
    #[must_use]
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            client: oauth_client(),
        }
    }

    /// Exchange authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange request fails or response is invalid
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderCallError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        self.token_request(&params).await
    }

    /// Refresh an expired access token
    ///
    /// The response usually omits `refresh_token`; callers keep the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token refresh request fails or response is invalid
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Credential, ProviderCallError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        self.token_request(&params).await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Credential, ProviderCallError> {
        let request = self.client.post(&self.config.token_url).form(params);
        let response: TokenResponse =
            send_json(self.config.service_name, "token response", request, 15).await?;
        Ok(self.credential_from_response(response))
    }

    fn credential_from_response(&self, response: TokenResponse) -> Credential {
        let lifetime = response
            .expires_in
            .and_then(|seconds| i64::try_from(seconds).ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRY_SECS);

        Credential {
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at: Utc::now() + Duration::seconds(lifetime),
            provider_key: self.config.provider_key.to_owned(),
        }
    }
}

/// OAuth 2.0 token response from provider
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
}

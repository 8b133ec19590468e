// ABOUTME: Facebook Graph API client for login, page management and Messenger replies
// ABOUTME: Exchanges short-lived tokens for verified long-lived credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Facebook Provider
//!
//! Facebook does not issue refresh tokens. A credential is "refreshed" by
//! exchanging the current token for a long-lived one and reading its expiry
//! back from `debug_token`, which is what [`CredentialRefresher`] does here.
//! Bearer calls are not retried; a rejected token surfaces as `AuthExpired`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::FacebookConfig;
use crate::constants::providers;
use crate::constants::service_names::FACEBOOK;
use crate::errors::{AppError, AppResult};
use crate::oauth2_client::{
    AuthFailureMatcher, Credential, CredentialRefresher, PhraseAuthFailureMatcher,
};
use crate::providers::errors::ProviderCallError;
use crate::utils::http_client::{api_client, send_json};

const USER_FIELDS: &str = "id,name,email,picture";
const PAGE_FIELDS: &str = "id,name,about,category,category_list,fan_count,followers_count,link,picture,cover,website,location,phone,emails,whatsapp_number,is_published,verification_status,description,mission,general_info,products,username";
const MESSAGE_FIELDS: &str = "message,from,created_time";

/// Long-lived tokens whose `debug_token` reports no expiry last about 60 days
const LONG_LIVED_FALLBACK_DAYS: i64 = 60;

/// Logged-in Facebook user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacebookUser {
    /// Facebook user id
    pub id: String,
    /// Display name
    pub name: String,
    /// Email, empty when not granted
    pub email: String,
    /// Avatar URL, empty when absent
    pub picture: String,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<Value>,
}

impl From<RawUser> for FacebookUser {
    fn from(raw: RawUser) -> Self {
        let picture = raw
            .picture
            .as_ref()
            .and_then(|p| p.pointer("/data/url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Self {
            id: raw.id,
            name: raw.name,
            email: raw.email.unwrap_or_default(),
            picture,
        }
    }
}

/// Facebook page as returned by the Graph API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacebookPage {
    /// Page id
    pub id: String,
    /// Page name
    #[serde(default)]
    pub name: String,
    /// Page category
    #[serde(default)]
    pub category: Option<String>,
    /// Page access token, only present when requested; never serialized back out
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    /// Remaining requested fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `debug_token` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// App the token belongs to
    #[serde(default)]
    pub app_id: Option<String>,
    /// Token type (`USER`, `PAGE`)
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    /// App name
    #[serde(default)]
    pub application: Option<String>,
    /// Unix time data access expires
    #[serde(default)]
    pub data_access_expires_at: i64,
    /// Unix time the token expires, `0` for never
    #[serde(default)]
    pub expires_at: i64,
    /// Whether the token is usable
    #[serde(default)]
    pub is_valid: bool,
    /// Granted permissions
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Owning user
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TokenInfo {
    /// Expiry to store for the token
    ///
    /// `data_access_expires_at` first, then `expires_at`, then the long-lived default.
    #[must_use]
    pub fn credential_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        [self.data_access_expires_at, self.expires_at]
            .into_iter()
            .filter(|ts| *ts > 0)
            .find_map(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::days(LONG_LIVED_FALLBACK_DAYS))
    }
}

/// Message of a page conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMessage {
    /// Message id
    #[serde(default)]
    pub id: String,
    /// Text, empty for attachments
    #[serde(default)]
    pub message: String,
    /// Sender
    pub from: MessageSender,
    /// ISO-8601 send time
    #[serde(default)]
    pub created_time: Option<String>,
}

/// Message sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    /// Sender id (page id or page-scoped user id)
    pub id: String,
    /// Sender name
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a Send API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// Recipient page-scoped id
    #[serde(default)]
    pub recipient_id: String,
    /// Sent message id
    #[serde(default)]
    pub message_id: String,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct DebugTokenEnvelope {
    data: TokenInfo,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

/// Client for the Facebook Graph API
pub struct FacebookClient {
    client_id: String,
    client_secret: String,
    verify_webhook_token: String,
    graph_url: String,
    http: Client,
    timeout_secs: u64,
    matcher: PhraseAuthFailureMatcher,
}

impl FacebookClient {
    /// Create a client for the configured Graph API version
    #[must_use]
    pub fn new(config: &FacebookConfig, timeout_secs: u64) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            verify_webhook_token: config.verify_webhook_token.clone(),
            graph_url: format!(
                "{}/{}",
                config.graph_base_url.trim_end_matches('/'),
                config.api_version
            ),
            http: api_client(timeout_secs),
            timeout_secs,
            matcher: PhraseAuthFailureMatcher::facebook(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.graph_url)
    }

    fn app_access_token(&self) -> String {
        format!("{}|{}", self.client_id, self.client_secret)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        field: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ProviderCallError> {
        send_json(FACEBOOK, field, request, self.timeout_secs).await
    }

    fn classify(&self, error: ProviderCallError) -> AppError {
        if self.matcher.is_auth_failure(&error) {
            warn!("Facebook rejected the access token: {error}");
            return AppError::auth_expired(error.message()).with_source(error);
        }
        AppError::from(error)
    }

    async fn raw_verify_token(&self, access_token: &str) -> Result<TokenInfo, ProviderCallError> {
        let app_token = self.app_access_token();
        let request = self.http.get(self.url("debug_token")).query(&[
            ("input_token", access_token),
            ("access_token", app_token.as_str()),
        ]);
        let envelope: DebugTokenEnvelope = self.send("debug_token", request).await?;
        Ok(envelope.data)
    }

    async fn raw_exchange(&self, short_lived: &str) -> Result<String, ProviderCallError> {
        let request = self.http.get(self.url("oauth/access_token")).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("fb_exchange_token", short_lived),
        ]);
        let response: ExchangeResponse = self.send("token exchange", request).await?;
        Ok(response.access_token)
    }

    async fn raw_exchange_and_verify(
        &self,
        short_lived: &str,
        provider_key: &str,
    ) -> Result<Credential, ProviderCallError> {
        let long_lived = self.raw_exchange(short_lived).await?;
        let info = self.raw_verify_token(&long_lived).await?;
        if !info.is_valid {
            return Err(ProviderCallError::ApiError {
                provider: FACEBOOK,
                status_code: 401,
                message: "Invalid OAuth access token".to_owned(),
                error_code: Some(crate::constants::oauth::FACEBOOK_INVALID_TOKEN_CODE),
            });
        }
        debug!(user_id = ?info.user_id, "verified long-lived token");
        Ok(Credential::new(
            provider_key,
            long_lived,
            info.credential_expiry(Utc::now()),
        ))
    }

    /// Inspect a token with the app token
    ///
    /// # Errors
    ///
    /// Returns an error if the Graph API call fails
    pub async fn verify_token(&self, access_token: &str) -> AppResult<TokenInfo> {
        self.raw_verify_token(access_token)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Exchange a token and read the new token's expiry from `debug_token`
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the token or reports it invalid
    #[instrument(skip(self, short_lived))]
    pub async fn exchange_and_verify_token(
        &self,
        short_lived: &str,
        provider_key: &str,
    ) -> AppResult<Credential> {
        self.raw_exchange_and_verify(short_lived, provider_key)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Profile of the token owner
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the token
    pub async fn get_user(&self, access_token: &str) -> AppResult<FacebookUser> {
        let request = self
            .http
            .get(self.url("me"))
            .query(&[("fields", USER_FIELDS), ("access_token", access_token)]);
        let raw: RawUser = self
            .send("user", request)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(raw.into())
    }

    /// Pages the user manages
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the token
    pub async fn get_pages(&self, access_token: &str) -> AppResult<Vec<FacebookPage>> {
        let request = self
            .http
            .get(self.url("me/accounts"))
            .query(&[("fields", PAGE_FIELDS), ("access_token", access_token)]);
        let envelope: DataEnvelope<FacebookPage> = self
            .send("pages", request)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(envelope.data)
    }

    /// One page, optionally with its page access token
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the token
    pub async fn get_page(
        &self,
        access_token: &str,
        page_id: &str,
        with_token: bool,
    ) -> AppResult<FacebookPage> {
        let fields = if with_token {
            format!("{PAGE_FIELDS},access_token")
        } else {
            PAGE_FIELDS.to_owned()
        };
        let request = self
            .http
            .get(self.url(page_id))
            .query(&[("fields", fields.as_str()), ("access_token", access_token)]);
        self.send("page", request)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Subscribe the app to the page's message events
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or Facebook reports no success
    #[instrument(skip(self, page_token))]
    pub async fn subscribe_app(&self, page_token: &str, page_id: &str) -> AppResult<()> {
        let request = self
            .http
            .post(self.url(&format!("{page_id}/subscribed_apps")))
            .query(&[("subscribed_fields", "messages"), ("access_token", page_token)]);
        let response: SuccessResponse = self
            .send("subscription", request)
            .await
            .map_err(|e| self.classify(e))?;
        if response.success {
            Ok(())
        } else {
            Err(AppError::external_service(
                FACEBOOK,
                "Page subscription was not accepted",
            ))
        }
    }

    /// Messenger conversation between the page and a user, if one exists
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the page token
    pub async fn get_conversation_id(
        &self,
        page_token: &str,
        page_id: &str,
        user_id: &str,
    ) -> AppResult<Option<String>> {
        let request = self
            .http
            .get(self.url(&format!("{page_id}/conversations")))
            .query(&[
                ("platform", "messenger"),
                ("user_id", user_id),
                ("access_token", page_token),
            ]);
        let envelope: DataEnvelope<IdOnly> = self
            .send("conversations", request)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(envelope.data.into_iter().next().map(|c| c.id))
    }

    /// Latest messages of a conversation, newest first
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the page token
    pub async fn get_conversation_messages(
        &self,
        page_token: &str,
        conversation_id: &str,
        limit: usize,
    ) -> AppResult<Vec<PageMessage>> {
        let limit = limit.to_string();
        let request = self
            .http
            .get(self.url(&format!("{conversation_id}/messages")))
            .query(&[
                ("fields", MESSAGE_FIELDS),
                ("limit", limit.as_str()),
                ("access_token", page_token),
            ]);
        let envelope: DataEnvelope<PageMessage> = self
            .send("messages", request)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(envelope.data)
    }

    /// Reply to a user through the page
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` if Facebook rejects the page token
    #[instrument(skip(self, page_token, text))]
    pub async fn send_message(
        &self,
        page_token: &str,
        page_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> AppResult<SendResult> {
        let request = self
            .http
            .post(self.url(&format!("{page_id}/messages")))
            .query(&[("access_token", page_token)])
            .json(&json!({
                "recipient": { "id": recipient_id },
                "messaging_type": "RESPONSE",
                "message": { "text": text },
            }));
        self.send("send result", request)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Challenge to echo for a webhook verification request, if it matches
    #[must_use]
    pub fn validate_webhook(&self, mode: &str, token: &str, challenge: &str) -> Option<String> {
        (mode == "subscribe"
            && !self.verify_webhook_token.is_empty()
            && token == self.verify_webhook_token)
            .then(|| challenge.to_owned())
    }
}

#[async_trait]
impl CredentialRefresher for FacebookClient {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderCallError> {
        let key = if credential.provider_key.is_empty() {
            providers::FACEBOOK
        } else {
            credential.provider_key.as_str()
        };
        self.raw_exchange_and_verify(&credential.access_token, key)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FacebookClient {
        FacebookClient::new(
            &FacebookConfig {
                client_id: "app".to_owned(),
                client_secret: "secret".to_owned(),
                verify_webhook_token: "verify-me".to_owned(),
                api_version: "v22.0".to_owned(),
                graph_base_url: "https://graph.example.com/".to_owned(),
            },
            5,
        )
    }

    #[test]
    fn test_validate_webhook() {
        let fb = client();
        assert_eq!(
            fb.validate_webhook("subscribe", "verify-me", "1158201444"),
            Some("1158201444".to_owned())
        );
        assert_eq!(fb.validate_webhook("subscribe", "wrong", "1"), None);
        assert_eq!(fb.validate_webhook("unsubscribe", "verify-me", "1"), None);
    }

    #[test]
    fn test_graph_url_includes_version() {
        assert_eq!(client().url("me"), "https://graph.example.com/v22.0/me");
        assert_eq!(client().app_access_token(), "app|secret");
    }

    #[test]
    fn test_credential_expiry_prefers_data_access() {
        let now = Utc::now();
        let info = TokenInfo {
            data_access_expires_at: 1_900_000_000,
            expires_at: 1_800_000_000,
            ..TokenInfo::default()
        };
        assert_eq!(info.credential_expiry(now).timestamp(), 1_900_000_000);

        let never = TokenInfo::default();
        assert_eq!(
            never.credential_expiry(now),
            now + Duration::days(LONG_LIVED_FALLBACK_DAYS)
        );
    }

    #[test]
    fn test_user_picture_flattened() {
        let raw: RawUser = serde_json::from_value(json!({
            "id": "42",
            "name": "Ada",
            "picture": {"data": {"url": "https://cdn.example.com/a.png"}}
        }))
        .unwrap();
        let user = FacebookUser::from(raw);
        assert_eq!(user.picture, "https://cdn.example.com/a.png");
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_page_token_not_serialized() {
        let page: FacebookPage = serde_json::from_value(json!({
            "id": "p1",
            "name": "Shop",
            "access_token": "secret-page-token",
            "fan_count": 10
        }))
        .unwrap();
        assert_eq!(page.access_token.as_deref(), Some("secret-page-token"));

        let out = serde_json::to_value(&page).unwrap();
        assert!(out.get("access_token").is_none());
        assert_eq!(out["fan_count"], 10);
    }
}

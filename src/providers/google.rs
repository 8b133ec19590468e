// ABOUTME: Google Sheets and userinfo client backing each business catalog spreadsheet
// ABOUTME: Every bearer call goes through the refreshing client with the default matcher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Google Sheets Provider
//!
//! A business catalog lives in a spreadsheet owned by the user's Google
//! account, with a `Products` sheet and an `Orders` sheet. Calls are made with
//! the user's stored Google credential, which is refreshed transparently
//! through [`RefreshingClient`] when Google rejects it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::config::GoogleConfig;
use crate::constants::providers;
use crate::constants::service_names;
use crate::constants::sheets::{
    DEFAULT_RANGE, ORDERS, ORDERS_HEADERS, ORDERS_HEADER_RANGE, PRODUCTS, PRODUCTS_HEADERS,
    PRODUCTS_HEADER_RANGE,
};
use crate::errors::{AppError, AppResult};
use crate::models::OrderRecord;
use crate::oauth2_client::{
    Credential, CredentialKey, CredentialRefresher, CredentialRotator, CredentialStore,
    OAuth2Client, OAuth2Config, PhraseAuthFailureMatcher, RefreshingClient,
};
use crate::providers::errors::ProviderCallError;
use crate::utils::http_client::{api_client, send_json};

/// Google account profile from the userinfo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleUser {
    /// Stable Google account id
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub picture: Option<String>,
}

/// Spreadsheet metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSpreadsheet {
    /// Spreadsheet id
    pub spreadsheet_id: String,
    /// Title and locale properties
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    /// Sheets in the spreadsheet
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
    /// Browser URL
    #[serde(default)]
    pub spreadsheet_url: Option<String>,
}

/// Spreadsheet level properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetProperties {
    /// Spreadsheet title
    #[serde(default)]
    pub title: String,
}

/// One sheet (tab)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    /// Sheet properties
    pub properties: SheetProperties,
}

/// Sheet id and title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    /// Numeric sheet id
    #[serde(default)]
    pub sheet_id: i64,
    /// Sheet title
    pub title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Client for the Google Sheets and userinfo APIs
pub struct GoogleSheetsClient {
    oauth: OAuth2Client,
    http: Client,
    sheets_base_url: String,
    userinfo_url: String,
    refreshing: RefreshingClient,
    timeout_secs: u64,
}

impl GoogleSheetsClient {
    /// Create a client rotating credentials through the shared `rotator`
    #[must_use]
    pub fn new(config: &GoogleConfig, rotator: Arc<CredentialRotator>, timeout: Duration) -> Self {
        let oauth = OAuth2Client::new(OAuth2Config {
            provider_key: providers::GOOGLE,
            service_name: service_names::GOOGLE,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: format!("{}/token", config.oauth_base_url.trim_end_matches('/')),
            redirect_uri: config.redirect_uri.clone(),
        });

        Self {
            oauth,
            http: api_client(timeout.as_secs()),
            sheets_base_url: config.sheets_base_url.trim_end_matches('/').to_owned(),
            userinfo_url: config.userinfo_url.clone(),
            refreshing: RefreshingClient::new(
                service_names::GOOGLE,
                rotator,
                Arc::new(PhraseAuthFailureMatcher::new()),
                timeout,
            ),
            timeout_secs: timeout.as_secs(),
        }
    }

    /// Exchange an authorization code for a credential
    ///
    /// # Errors
    ///
    /// Returns an error if Google rejects the code
    #[instrument(skip(self, code))]
    pub async fn exchange_code_for_tokens(&self, code: &str) -> AppResult<Credential> {
        let credential = self.oauth.exchange_code(code).await?;
        if credential.refresh_token.is_none() {
            debug!("Google did not issue a refresh token for this grant");
        }
        Ok(credential)
    }

    /// Run the `refresh_token` grant for `credential`
    ///
    /// # Errors
    ///
    /// Returns an error if the credential has no refresh token or Google rejects it
    pub async fn refresh_access_token(
        &self,
        credential: &Credential,
    ) -> Result<Credential, ProviderCallError> {
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Err(ProviderCallError::ApiError {
                provider: service_names::GOOGLE,
                status_code: 400,
                message: "No refresh token available".to_owned(),
                error_code: None,
            });
        };
        self.oauth.refresh_token(refresh_token).await
    }

    /// Profile of the connected Google account
    ///
    /// # Errors
    ///
    /// Returns an error if the user has no Google credential or the call fails
    #[instrument(skip(self))]
    pub async fn get_user_info(&self, user_uid: &str) -> AppResult<GoogleUser> {
        let url = self.userinfo_url.clone();
        self.authorized(user_uid, "user info", move |http| http.get(&url))
            .await
    }

    /// Create a catalog spreadsheet with header rows on both sheets
    ///
    /// # Errors
    ///
    /// Returns an error if the user has no Google credential or a call fails
    #[instrument(skip(self))]
    pub async fn create_spreadsheet(
        &self,
        user_uid: &str,
        title: &str,
    ) -> AppResult<GoogleSpreadsheet> {
        let url = format!("{}/spreadsheets", self.sheets_base_url);
        let body = json!({
            "properties": { "title": title },
            "sheets": [
                { "properties": { "title": PRODUCTS } },
                { "properties": { "title": ORDERS } },
            ],
        });
        let spreadsheet: GoogleSpreadsheet = self
            .authorized(user_uid, "spreadsheet", |http| http.post(&url).json(&body))
            .await?;

        let headers_url = format!(
            "{}/spreadsheets/{}/values:batchUpdate",
            self.sheets_base_url, spreadsheet.spreadsheet_id
        );
        let headers = json!({
            "valueInputOption": "USER_ENTERED",
            "data": [
                { "range": PRODUCTS_HEADER_RANGE, "values": [PRODUCTS_HEADERS] },
                { "range": ORDERS_HEADER_RANGE, "values": [ORDERS_HEADERS] },
            ],
        });
        let _: Value = self
            .authorized(user_uid, "batch update", |http| {
                http.post(&headers_url).json(&headers)
            })
            .await?;

        info!(spreadsheet_id = %spreadsheet.spreadsheet_id, "created catalog spreadsheet");
        Ok(spreadsheet)
    }

    /// Spreadsheet metadata
    ///
    /// # Errors
    ///
    /// Returns an error if the user has no Google credential or the call fails
    pub async fn get_spreadsheet(
        &self,
        user_uid: &str,
        spreadsheet_id: &str,
    ) -> AppResult<GoogleSpreadsheet> {
        let url = format!("{}/spreadsheets/{spreadsheet_id}", self.sheets_base_url);
        self.authorized(user_uid, "spreadsheet", |http| http.get(&url))
            .await
    }

    /// Raw cell values of `sheet`, header row first, rendered as strings
    ///
    /// # Errors
    ///
    /// Returns an error if the user has no Google credential or the call fails
    #[instrument(skip(self))]
    pub async fn get_sheet(
        &self,
        user_uid: &str,
        spreadsheet_id: &str,
        sheet: &str,
    ) -> AppResult<Vec<Vec<String>>> {
        let url = format!(
            "{}/spreadsheets/{spreadsheet_id}/values/{sheet}!{DEFAULT_RANGE}",
            self.sheets_base_url
        );
        let range: ValueRange = self
            .authorized(user_uid, "value range", |http| http.get(&url))
            .await?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Append one order row to the Orders sheet
    ///
    /// # Errors
    ///
    /// Returns an error if the user has no Google credential or the call fails
    #[instrument(skip(self, order), fields(product = %order.product))]
    pub async fn append_order(
        &self,
        user_uid: &str,
        spreadsheet_id: &str,
        order: &OrderRecord,
    ) -> AppResult<()> {
        let url = format!(
            "{}/spreadsheets/{spreadsheet_id}/values/{ORDERS}:append",
            self.sheets_base_url
        );
        let body = json!({ "values": [order.to_row()] });
        let _: Value = self
            .authorized(user_uid, "append result", |http| {
                http.post(&url)
                    .query(&[("valueInputOption", "USER_ENTERED")])
                    .json(&body)
            })
            .await?;
        Ok(())
    }

    async fn authorized<T, B>(&self, user_uid: &str, field: &'static str, build: B) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let key = CredentialKey::new(user_uid, providers::GOOGLE);
        let credential = self.refreshing.store().load(&key).await?.ok_or_else(|| {
            AppError::invalid_input("User is not connected to a Google account yet")
                .with_principal(user_uid)
        })?;

        let timeout_secs = self.timeout_secs;
        self.refreshing
            .call(&key, credential, self, |credential| {
                let request = build(&self.http).bearer_auth(&credential.access_token);
                async move {
                    send_json(service_names::GOOGLE, field, request, timeout_secs).await
                }
            })
            .await
    }
}

#[async_trait]
impl CredentialRefresher for GoogleSheetsClient {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, ProviderCallError> {
        self.refresh_access_token(credential).await
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ABOUTME: Business domain service: page onboarding, settings, catalog data and agent conversations
// ABOUTME: Runs the conversation engine for chat tests and incoming Messenger messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Business Service
//!
//! Business rules:
//! - a Facebook page belongs to at most one business
//! - a business with `ai_behaviour == 1` gets a catalog spreadsheet, and the
//!   agent gets the catalog tools bound to it
//! - the agent only answers page messages while `status == 1`, which
//!   requires a system prompt

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

use super::catalog::SheetCatalog;
use crate::config::AppInfoConfig;
use crate::constants::limits::{MAX_CONVERSATION_MESSAGES, MAX_MESSAGE_CHARS};
use crate::constants::providers;
use crate::constants::sheets::{ORDERS, PRODUCTS};
use crate::conversation::{ConversationEngine, ExchangeRequest};
use crate::database::{BusinessRepository, PageBusiness};
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::business_system_instruction;
use crate::llm::ConversationTurn;
use crate::middleware::create_exchange_span;
use crate::models::{Business, BusinessUpdate, ChatTestRequest, MessageResponse};
use crate::oauth2_client::{CredentialKey, CredentialStore};
use crate::providers::{
    format_sheet_rows, FacebookClient, FacebookPage, GoogleSheetsClient, GoogleSpreadsheet,
    PageMessage, SheetTable,
};
use crate::tools::{catalog_registry, ToolRegistry};

/// Payload of `POST /business/create`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBusinessRequest {
    /// Facebook page to connect
    pub page_id: String,
    /// `1` to back the agent with a catalog spreadsheet
    #[serde(default)]
    pub ai_behaviour: i32,
}

/// Google side of a business
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleInfo {
    /// Catalog spreadsheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet: Option<GoogleSpreadsheet>,
}

/// Business with its page and spreadsheet
#[derive(Debug, Clone, Serialize)]
pub struct BusinessInfo {
    /// Stored business
    #[serde(flatten)]
    pub business: Business,
    /// Connected page
    pub facebook: Option<FacebookPage>,
    /// Connected spreadsheet
    pub google: GoogleInfo,
}

/// Business operations
pub struct BusinessService {
    businesses: Arc<dyn BusinessRepository>,
    credentials: Arc<dyn CredentialStore>,
    facebook: Arc<FacebookClient>,
    google: Arc<GoogleSheetsClient>,
    engine: Arc<ConversationEngine>,
    app: AppInfoConfig,
    shutdown: CancellationToken,
}

impl BusinessService {
    /// Create the service; exchanges are cancelled when `shutdown` fires
    #[must_use]
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        credentials: Arc<dyn CredentialStore>,
        facebook: Arc<FacebookClient>,
        google: Arc<GoogleSheetsClient>,
        engine: Arc<ConversationEngine>,
        app: AppInfoConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            businesses,
            credentials,
            facebook,
            google,
            engine,
            app,
            shutdown,
        }
    }

    /// Connect a page as a new business
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` when the page is linked to a business
    /// - `NotFound` when the user has no Facebook credential
    /// - `InvalidInput` when Facebook returns no page token, or a sheet is
    ///   requested without a connected Google account
    #[instrument(skip(self, request), fields(page_id = %request.page_id))]
    pub async fn create(
        &self,
        user_uid: &str,
        request: CreateBusinessRequest,
    ) -> AppResult<BusinessInfo> {
        if let Some(existing) = self.businesses.find_by_page(&request.page_id).await? {
            return Err(AppError::already_exists(format!(
                "Facebook page with ID \"{}\" is already linked to business \"{}\".",
                request.page_id, existing.business.uid
            )));
        }

        let user_token = self.user_facebook_token(user_uid).await?;
        let page = self
            .facebook
            .get_page(&user_token, &request.page_id, true)
            .await?;
        let Some(page_token) = page.access_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(AppError::invalid_input(format!(
                "No page access token found with id : {}",
                request.page_id
            )));
        };

        self.facebook
            .subscribe_app(page_token, &request.page_id)
            .await?;
        let page_credential = self
            .facebook
            .exchange_and_verify_token(page_token, providers::FACEBOOK_PAGE)
            .await?;

        let mut business = Business::new(request.ai_behaviour);
        self.businesses.create(&business).await?;
        self.businesses.link_user(&business.uid, user_uid).await?;
        self.businesses
            .link_page(&business.uid, &request.page_id)
            .await?;
        self.credentials
            .persist(
                &CredentialKey::new(&request.page_id, providers::FACEBOOK_PAGE),
                page_credential,
            )
            .await?;
        business.facebook_page_id = Some(request.page_id.clone());

        let mut google = GoogleInfo::default();
        if business.uses_sheet() {
            let spreadsheet = self
                .create_sheet(user_uid, &business.uid, &page.name)
                .await?;
            business.google_sheet_id = Some(spreadsheet.spreadsheet_id.clone());
            google.spreadsheet = Some(spreadsheet);
        }

        info!(business_uid = %business.uid, "business created");
        Ok(BusinessInfo {
            business,
            facebook: Some(page),
            google,
        })
    }

    /// Business of `user_uid` with its page and spreadsheet
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the business does not exist or belongs to someone else
    pub async fn get(&self, user_uid: &str, business_uid: &str) -> AppResult<BusinessInfo> {
        let business = self.owned(user_uid, business_uid).await?;
        self.describe(user_uid, business).await
    }

    /// Every business of `user_uid`
    ///
    /// # Errors
    ///
    /// Returns an error if a page or spreadsheet cannot be fetched
    pub async fn list(&self, user_uid: &str) -> AppResult<Vec<BusinessInfo>> {
        let businesses = self.businesses.list_by_user(user_uid).await?;
        let mut described = Vec::with_capacity(businesses.len());
        for business in businesses {
            described.push(self.describe(user_uid, business).await?);
        }
        Ok(described)
    }

    /// Apply a settings change
    ///
    /// # Errors
    ///
    /// - `InvalidInput` "No data to update" when nothing would change
    /// - `InvalidInput` when activating without a system prompt
    /// - a Google error when enabling the catalog creates a spreadsheet
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        user_uid: &str,
        business_uid: &str,
        update: BusinessUpdate,
    ) -> AppResult<BusinessInfo> {
        let mut business = self.owned(user_uid, business_uid).await?;

        if update.is_noop_for(&business) {
            return Err(AppError::invalid_input("No data to update"));
        }

        let prompt_after = update
            .ai_system_prompt
            .as_ref()
            .or(business.ai_system_prompt.as_ref())
            .is_some_and(|p| !p.trim().is_empty());
        if update.status == Some(1) && !prompt_after {
            return Err(AppError::invalid_input("Business information are required"));
        }

        if update.ai_behaviour == Some(1) && business.google_sheet_id.is_none() {
            let page_name = self
                .page(&business)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();
            let spreadsheet = self
                .create_sheet(user_uid, business_uid, &page_name)
                .await?;
            business.google_sheet_id = Some(spreadsheet.spreadsheet_id);
        }

        update.apply_to(&mut business);
        self.businesses.update(&business).await?;
        self.get(user_uid, business_uid).await
    }

    /// Formatted `Products` sheet
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the business has no spreadsheet
    pub async fn products(&self, user_uid: &str, business_uid: &str) -> AppResult<SheetTable> {
        self.sheet(user_uid, business_uid, PRODUCTS).await
    }

    /// Formatted `Orders` sheet
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the business has no spreadsheet
    pub async fn orders(&self, user_uid: &str, business_uid: &str) -> AppResult<SheetTable> {
        self.sheet(user_uid, business_uid, ORDERS).await
    }

    /// Try the agent with the application's own information and no tools
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty, too long or over-long conversation,
    /// or the engine's error
    pub async fn app_chat_test(&self, request: ChatTestRequest) -> AppResult<MessageResponse> {
        validate_chat_test(&request)?;
        let instruction = business_system_instruction(&self.app.name, &self.app.information, false);
        self.exchange(
            "app_chat_test",
            None,
            chat_test_history(&request),
            instruction,
            &ToolRegistry::new(),
        )
        .await
    }

    /// Try the agent with a draft system prompt and the business's tools
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the request is invalid or carries no draft
    /// prompt, `NotFound` for a foreign business, or the engine's error
    pub async fn chat_test(
        &self,
        user_uid: &str,
        business_uid: &str,
        request: ChatTestRequest,
    ) -> AppResult<MessageResponse> {
        validate_chat_test(&request)?;
        let information = request
            .test_ai_system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("Business information are required"))?;

        let business = self.owned(user_uid, business_uid).await?;
        let tools = self.tools_for(&business, user_uid);
        let instruction =
            business_system_instruction(&self.app.name, information, !tools.is_empty());

        self.exchange(
            "chat_test",
            Some(business_uid),
            chat_test_history(&request),
            instruction,
            &tools,
        )
        .await
    }

    /// Answer a Messenger message sent by `sender_id` to the page `page_id`
    ///
    /// Returns `None` when the business is inactive and no reply was sent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown page, or any provider or engine error
    #[instrument(skip(self, text))]
    pub async fn handle_page_message(
        &self,
        sender_id: &str,
        page_id: &str,
        text: &str,
    ) -> AppResult<Option<MessageResponse>> {
        let PageBusiness {
            business,
            owner_uid,
        } = self
            .businesses
            .find_by_page(page_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Business for page '{page_id}'")))?;

        let page_token = self.page_token(page_id).await?;

        let stored = self
            .businesses
            .find_conversation(&business.uid, sender_id)
            .await?;
        let conversation_id = match stored {
            Some(id) => Some(id),
            None => {
                let found = self
                    .facebook
                    .get_conversation_id(&page_token, page_id, sender_id)
                    .await?;
                if let Some(id) = &found {
                    self.businesses
                        .insert_conversation(&business.uid, id, sender_id)
                        .await?;
                }
                found
            }
        };

        let messages = match &conversation_id {
            Some(id) => {
                self.facebook
                    .get_conversation_messages(&page_token, id, MAX_CONVERSATION_MESSAGES)
                    .await?
            }
            None => Vec::new(),
        };

        if !business.is_active() {
            debug!(business_uid = %business.uid, "business inactive, not replying");
            return Ok(None);
        }

        let information = business.ai_system_prompt.clone().unwrap_or_default();
        let tools = self.tools_for(&business, &owner_uid);
        let instruction =
            business_system_instruction(&self.app.name, &information, !tools.is_empty());

        let reply = self
            .exchange(
                "messenger",
                Some(&business.uid),
                page_history(&messages, sender_id, text),
                instruction,
                &tools,
            )
            .await?;
        self.facebook
            .send_message(&page_token, page_id, sender_id, &reply.text)
            .await?;
        Ok(Some(reply))
    }

    async fn exchange(
        &self,
        origin: &str,
        business_uid: Option<&str>,
        history: Vec<ConversationTurn>,
        system_instruction: String,
        tools: &ToolRegistry,
    ) -> AppResult<MessageResponse> {
        let cancel = self.shutdown.child_token();
        let span = create_exchange_span(origin, business_uid);
        let outcome = self
            .engine
            .run(
                ExchangeRequest {
                    history,
                    system_instruction: Some(system_instruction),
                },
                tools,
                &cancel,
            )
            .instrument(span.clone())
            .await?;
        span.record("round_trips", outcome.usage.round_trips);
        span.record("total_tokens", outcome.usage.total_tokens);
        Ok(MessageResponse {
            text: outcome.text,
            total_token_count: outcome.usage.total_tokens,
        })
    }

    fn tools_for(&self, business: &Business, owner_uid: &str) -> ToolRegistry {
        match (&business.google_sheet_id, business.uses_sheet()) {
            (Some(sheet_id), true) => catalog_registry(Arc::new(SheetCatalog::new(
                self.google.clone(),
                owner_uid,
                sheet_id,
            ))),
            _ => ToolRegistry::new(),
        }
    }

    async fn owned(&self, user_uid: &str, business_uid: &str) -> AppResult<Business> {
        self.businesses
            .find_by_user_and_uid(user_uid, business_uid)
            .await?
            .ok_or_else(|| AppError::not_found("Business"))
    }

    async fn describe(&self, user_uid: &str, business: Business) -> AppResult<BusinessInfo> {
        let facebook = self.page(&business).await?;
        let spreadsheet = match &business.google_sheet_id {
            Some(id) => Some(self.google.get_spreadsheet(user_uid, id).await?),
            None => None,
        };
        Ok(BusinessInfo {
            business,
            facebook,
            google: GoogleInfo { spreadsheet },
        })
    }

    async fn page(&self, business: &Business) -> AppResult<Option<FacebookPage>> {
        let Some(page_id) = &business.facebook_page_id else {
            return Ok(None);
        };
        let token = self.page_token(page_id).await?;
        self.facebook.get_page(&token, page_id, false).await.map(Some)
    }

    async fn sheet(
        &self,
        user_uid: &str,
        business_uid: &str,
        sheet: &str,
    ) -> AppResult<SheetTable> {
        let business = self.owned(user_uid, business_uid).await?;
        let sheet_id = business
            .google_sheet_id
            .ok_or_else(|| AppError::invalid_input("Business does not have a Google sheet"))?;
        let raw = self.google.get_sheet(user_uid, &sheet_id, sheet).await?;
        Ok(format_sheet_rows(&raw))
    }

    async fn create_sheet(
        &self,
        user_uid: &str,
        business_uid: &str,
        page_name: &str,
    ) -> AppResult<GoogleSpreadsheet> {
        let title = format!("{} - {page_name}", self.app.name);
        let spreadsheet = self.google.create_spreadsheet(user_uid, &title).await?;
        self.businesses
            .link_sheet(business_uid, &spreadsheet.spreadsheet_id)
            .await?;
        Ok(spreadsheet)
    }

    async fn user_facebook_token(&self, user_uid: &str) -> AppResult<String> {
        self.credentials
            .load(&CredentialKey::new(user_uid, providers::FACEBOOK))
            .await?
            .map(|c| c.access_token)
            .ok_or_else(|| AppError::not_found(format!("User facebook with uid : {user_uid}")))
    }

    async fn page_token(&self, page_id: &str) -> AppResult<String> {
        match self
            .credentials
            .load(&CredentialKey::new(page_id, providers::FACEBOOK_PAGE))
            .await?
        {
            Some(credential) => Ok(credential.access_token),
            None => {
                warn!(page_id, "no stored token for page");
                Err(AppError::not_found(format!("Token of page '{page_id}'")))
            }
        }
    }
}

fn validate_chat_test(request: &ChatTestRequest) -> AppResult<()> {
    if request.conversation.len() > MAX_CONVERSATION_MESSAGES {
        return Err(AppError::invalid_input(format!(
            "Conversation is too long (max {MAX_CONVERSATION_MESSAGES} messages)"
        )));
    }
    let text = request.message.text.as_str();
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::invalid_input(format!(
            "Message is too long (max {MAX_MESSAGE_CHARS} characters)"
        )));
    }
    if text.trim().is_empty() {
        return Err(AppError::invalid_input("Message is required"));
    }
    Ok(())
}

/// Earlier turns, oldest first, then the new message
fn chat_test_history(request: &ChatTestRequest) -> Vec<ConversationTurn> {
    request
        .conversation
        .iter()
        .filter(|turn| !turn.content.text.trim().is_empty())
        .map(|turn| {
            if turn.role.eq_ignore_ascii_case("user") {
                ConversationTurn::user_text(turn.content.text.clone())
            } else {
                ConversationTurn::model_text(turn.content.text.clone())
            }
        })
        .chain(std::iter::once(ConversationTurn::user_text(
            request.message.text.clone(),
        )))
        .collect()
}

/// Page messages (newest first) as history ending with the incoming `text`
fn page_history(messages: &[PageMessage], sender_id: &str, text: &str) -> Vec<ConversationTurn> {
    let mut history: Vec<ConversationTurn> = messages
        .iter()
        .rev()
        .filter(|m| !m.message.trim().is_empty())
        .map(|m| {
            if m.from.id == sender_id {
                ConversationTurn::user_text(m.message.clone())
            } else {
                ConversationTurn::model_text(m.message.clone())
            }
        })
        .collect();

    let newest_is_incoming = messages
        .first()
        .is_some_and(|m| m.from.id == sender_id && m.message == text);
    if !newest_is_incoming {
        history.push(ConversationTurn::user_text(text));
    }
    history
}

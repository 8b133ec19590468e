// ABOUTME: Facebook Messenger webhook: subscription challenge and message batches
// ABOUTME: Batches are processed event by event and always acknowledged with 200
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Messenger Webhook
//!
//! Facebook retries a batch until it gets a 200, so a failing event is logged
//! and skipped rather than failing the request. Responses on this route are
//! not enveloped.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::resources::ServerResources;

/// Query of the subscription challenge
#[derive(Debug, Default, Deserialize)]
pub struct ChallengeQuery {
    /// Expected to be `subscribe`
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    /// Must match `FB_VERIFY_WEBHOOK_TOKEN`
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
    /// Echoed back on success
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

/// Webhook notification body
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    /// `page` for Messenger notifications
    #[serde(default)]
    pub object: String,
    /// One entry per page
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// Notifications for one page
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    /// Page id
    #[serde(default)]
    pub id: String,
    /// Messaging events, oldest first
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// Participant id wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    /// Page-scoped id
    pub id: String,
}

/// One messaging event
#[derive(Debug, Default, Deserialize)]
pub struct MessagingEvent {
    /// Customer
    pub sender: Option<Participant>,
    /// Page
    pub recipient: Option<Participant>,
    /// Present for message events
    pub message: Option<IncomingMessage>,
}

/// Message content of an event
#[derive(Debug, Default, Deserialize)]
pub struct IncomingMessage {
    /// Text, absent for attachments
    pub text: Option<String>,
    /// Set on copies of the page's own messages
    #[serde(default)]
    pub is_echo: bool,
}

impl MessagingEvent {
    /// `(sender, page, text)` when the event is a customer text message
    #[must_use]
    pub fn customer_text(&self) -> Option<(&str, &str, &str)> {
        let message = self.message.as_ref().filter(|m| !m.is_echo)?;
        let text = message.text.as_deref().filter(|t| !t.trim().is_empty())?;
        Some((
            self.sender.as_ref()?.id.as_str(),
            self.recipient.as_ref()?.id.as_str(),
            text,
        ))
    }
}

/// Webhook routes
pub struct WebhookRoutes;

impl WebhookRoutes {
    /// Create the webhook routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/facebook/webhook",
                get(Self::handle_challenge).post(Self::handle_batch),
            )
            .with_state(resources)
    }

    async fn handle_challenge(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<ChallengeQuery>,
    ) -> String {
        resources
            .facebook
            .validate_webhook(&query.mode, &query.verify_token, &query.challenge)
            .unwrap_or_else(|| {
                warn!(mode = %query.mode, "webhook verification rejected");
                "false".to_owned()
            })
    }

    #[instrument(skip_all)]
    async fn handle_batch(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> (StatusCode, &'static str) {
        match serde_json::from_slice::<WebhookPayload>(&body) {
            Ok(payload) => Self::process(&resources, &payload).await,
            Err(e) => warn!("ignoring malformed webhook payload: {e}"),
        }
        (StatusCode::OK, "EVENT_RECEIVED")
    }

    async fn process(resources: &ServerResources, payload: &WebhookPayload) {
        debug!(object = %payload.object, entries = payload.entry.len(), "webhook batch");

        for event in payload.entry.iter().flat_map(|entry| entry.messaging.iter()) {
            let Some((sender, page_id, text)) = event.customer_text() else {
                debug!("skipping webhook event without customer text");
                continue;
            };

            match resources
                .businesses
                .handle_page_message(sender, page_id, text)
                .await
            {
                Ok(Some(reply)) => info!(
                    page_id,
                    total_tokens = reply.total_token_count,
                    "replied to page message"
                ),
                Ok(None) => debug!(page_id, "page message left unanswered"),
                Err(e) => warn!(page_id, sender, "failed to handle page message: {e}"),
            }
        }
    }
}

// ABOUTME: Core data models for users, businesses, orders and conversations
// ABOUTME: Shared between repositories, services, tools and route handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Data Models
//!
//! - `User` and `FacebookLink`: an account and the Facebook identity it logs in with
//! - `Business`: a Facebook page run by the AI agent, optionally backed by a spreadsheet
//! - `OrderRecord`: one row of the Orders sheet
//! - `ChatTestRequest`: payload of the chat test endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::sheets::{AI_BEHAVIOUR_WITH_SHEET, DEFAULT_ORDER_STATUS};

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id
    pub uid: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New account with a random id
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

/// Facebook identity an account logs in with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacebookLink {
    /// Account id
    pub user_uid: String,
    /// Facebook user id
    pub facebook_id: String,
}

/// Business run by the AI agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    /// Business id
    pub uid: String,
    /// `1` when the catalog spreadsheet backs the agent
    pub ai_behaviour: i32,
    /// Persona and business information given to the model
    pub ai_system_prompt: Option<String>,
    /// `1` when the agent answers page messages
    pub status: i32,
    /// Facebook page the business answers on
    pub facebook_page_id: Option<String>,
    /// Catalog spreadsheet
    pub google_sheet_id: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// New inactive business
    #[must_use]
    pub fn new(ai_behaviour: i32) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().to_string(),
            ai_behaviour,
            ai_system_prompt: None,
            status: 0,
            facebook_page_id: None,
            google_sheet_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the agent answers page messages
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status == 1
    }

    /// Whether the agent should read the catalog spreadsheet
    #[must_use]
    pub const fn uses_sheet(&self) -> bool {
        self.ai_behaviour == AI_BEHAVIOUR_WITH_SHEET
    }
}

/// Partial update of a business; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUpdate {
    /// New behaviour flag
    pub ai_behaviour: Option<i32>,
    /// New system prompt
    pub ai_system_prompt: Option<String>,
    /// New status
    pub status: Option<i32>,
}

impl BusinessUpdate {
    /// Whether applying this update to `business` would change nothing
    #[must_use]
    pub fn is_noop_for(&self, business: &Business) -> bool {
        self.ai_behaviour.is_none_or(|v| v == business.ai_behaviour)
            && self
                .ai_system_prompt
                .as_ref()
                .is_none_or(|v| Some(v) == business.ai_system_prompt.as_ref())
            && self.status.is_none_or(|v| v == business.status)
    }

    /// Apply the set fields to `business`
    pub fn apply_to(&self, business: &mut Business) {
        if let Some(ai_behaviour) = self.ai_behaviour {
            business.ai_behaviour = ai_behaviour;
        }
        if let Some(prompt) = &self.ai_system_prompt {
            business.ai_system_prompt = Some(prompt.clone());
        }
        if let Some(status) = self.status {
            business.status = status;
        }
        business.updated_at = Utc::now();
    }
}

/// Order placed through the agent, one row of the Orders sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Customer name
    pub fullname: String,
    /// Customer phone
    pub phone: String,
    /// Product name as listed in the catalog
    pub product: String,
    /// Ordered quantity
    pub quantity: u32,
    /// Unit price times quantity
    pub total: f64,
    /// Delivery address
    pub address: String,
    /// Free-form note
    pub note: String,
    /// Order status
    pub status: String,
}

impl OrderRecord {
    /// Cells in Orders sheet column order
    #[must_use]
    pub fn to_row(&self) -> Vec<serde_json::Value> {
        vec![
            self.fullname.clone().into(),
            self.phone.clone().into(),
            self.product.clone().into(),
            self.quantity.into(),
            self.total.into(),
            self.address.clone().into(),
            self.note.clone().into(),
            self.status.clone().into(),
        ]
    }
}

/// Order requested by the model before pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Product name
    pub product_name: String,
    /// Quantity (at least 1)
    pub quantity: u32,
    /// Customer name
    pub fullname: String,
    /// Customer phone
    pub phone: String,
    /// Delivery address
    pub address: String,
    /// Optional note
    pub note: String,
}

impl NewOrder {
    /// Price the order into a pending `OrderRecord`
    #[must_use]
    pub fn priced(self, product: String, unit_price: f64) -> OrderRecord {
        OrderRecord {
            fullname: self.fullname,
            phone: self.phone,
            product,
            quantity: self.quantity,
            total: unit_price * f64::from(self.quantity),
            address: self.address,
            note: self.note,
            status: DEFAULT_ORDER_STATUS.to_owned(),
        }
    }
}

/// Text message content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageText {
    /// Message text
    #[serde(default)]
    pub text: String,
}

/// Earlier turn of a chat test conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTestTurn {
    /// When the message was sent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// `user`, or `model`/`assistant` for agent replies
    pub role: String,
    /// Message content
    pub content: MessageText,
}

/// Payload of the chat test endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTestRequest {
    /// New user message
    pub message: MessageText,
    /// Previous turns, oldest first
    #[serde(default)]
    pub conversation: Vec<ChatTestTurn>,
    /// Draft system prompt under test
    #[serde(default)]
    pub test_ai_system_prompt: Option<String>,
}

/// Agent reply with token accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Final model text
    pub text: String,
    /// Tokens consumed across all round-trips
    pub total_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_update_noop_detection() {
        let mut business = Business::new(0);
        business.ai_system_prompt = Some("Sell mugs".to_owned());

        assert!(BusinessUpdate::default().is_noop_for(&business));
        assert!(BusinessUpdate {
            ai_system_prompt: Some("Sell mugs".to_owned()),
            status: Some(0),
            ..BusinessUpdate::default()
        }
        .is_noop_for(&business));
        assert!(!BusinessUpdate {
            status: Some(1),
            ..BusinessUpdate::default()
        }
        .is_noop_for(&business));
    }

    #[test]
    fn test_order_pricing() {
        let order = NewOrder {
            product_name: "blue mug".to_owned(),
            quantity: 3,
            fullname: "Ada".to_owned(),
            phone: "0100".to_owned(),
            address: "1 Main St".to_owned(),
            note: String::new(),
        }
        .priced("Blue Mug".to_owned(), 12.5);

        assert!((order.total - 37.5).abs() < f64::EPSILON);
        assert_eq!(order.status, DEFAULT_ORDER_STATUS);
        assert_eq!(order.to_row().len(), 8);
    }

    #[test]
    fn test_chat_test_request_wire_format() {
        let request: ChatTestRequest = serde_json::from_value(serde_json::json!({
            "message": {"text": "Do you have mugs?"},
            "conversation": [{"role": "user", "content": {"text": "Hi"}}],
            "testAiSystemPrompt": "You sell mugs"
        }))
        .unwrap();

        assert_eq!(request.conversation.len(), 1);
        assert_eq!(request.test_ai_system_prompt.as_deref(), Some("You sell mugs"));
    }
}

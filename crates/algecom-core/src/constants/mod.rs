// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pure data constants for sessions, providers, sheets and the AI agent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single
//! flat namespace.

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
}

/// API routes
pub mod routes {
    /// Version prefix every route is mounted under
    pub const API_PREFIX: &str = "/v1";
    /// Facebook webhook route, excluded from the response envelope
    pub const FACEBOOK_WEBHOOK: &str = "/v1/facebook/webhook";
    /// Routes reachable without a session, relative to [`API_PREFIX`]
    pub const PUBLIC_ROUTES: &[&str] = &[
        "",
        "/login/*",
        "/chat/test",
        "/facebook/webhook",
        "/cronjob/*",
    ];
}

/// Session cookie and renewal policy
pub mod session {
    /// Cookie carrying the signed session token
    pub const COOKIE_NAME: &str = "authToken";
    /// Renew once the embedded credential has less than this left (10 days)
    pub const RENEWAL_THRESHOLD_SECS: i64 = 10 * 24 * 60 * 60;
    /// Lifetime of a freshly signed session token (60 days)
    pub const SESSION_TTL_SECS: i64 = 60 * 24 * 60 * 60;
    /// JWT signing algorithm name
    pub const JWT_ALGORITHM: &str = "HS256";
}

/// Provider keys used by the credential store
pub mod providers {
    /// Facebook user credentials
    pub const FACEBOOK: &str = "facebook";
    /// Long-lived Facebook page credentials, keyed by page id
    pub const FACEBOOK_PAGE: &str = "facebook_page";
    /// Google Sheets credentials
    pub const GOOGLE: &str = "google";
}

/// OAuth client defaults
pub mod oauth {
    /// Messages that identify a rejected bearer token
    pub const INVALID_TOKEN_PHRASES: &[&str] = &["invalid_token", "Invalid Credentials", "401"];
    /// Graph API error code for expired or revoked tokens
    pub const FACEBOOK_INVALID_TOKEN_CODE: i64 = 190;
    /// Facebook tokens expiring within this window are refreshed by the sweep (10 days)
    pub const FACEBOOK_REFRESH_WINDOW_SECS: i64 = 10 * 24 * 60 * 60;
    /// Google tokens expiring within this window are refreshed by the sweep (10 minutes)
    pub const GOOGLE_REFRESH_WINDOW_SECS: i64 = 10 * 60;
    /// Fallback lifetime when a token response omits `expires_in`
    pub const DEFAULT_TOKEN_EXPIRY_SECS: i64 = 3600;
    /// Default Graph API version
    pub const FACEBOOK_API_VERSION: &str = "v22.0";
}

/// Upstream service base URLs
pub mod urls {
    /// Google OAuth token endpoint base
    pub const GOOGLE_OAUTH_BASE: &str = "https://oauth2.googleapis.com";
    /// Google Sheets API base
    pub const GOOGLE_SHEETS_BASE: &str = "https://sheets.googleapis.com/v4";
    /// Google userinfo endpoint
    pub const GOOGLE_USERINFO: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
    /// Facebook Graph API base
    pub const FACEBOOK_GRAPH_BASE: &str = "https://graph.facebook.com";
    /// Gemini API base
    pub const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
}

/// Spreadsheet layout
pub mod sheets {
    /// Catalog sheet
    pub const PRODUCTS: &str = "Products";
    /// Orders sheet
    pub const ORDERS: &str = "Orders";
    /// Default read range
    pub const DEFAULT_RANGE: &str = "A1:Z";
    /// Products header range
    pub const PRODUCTS_HEADER_RANGE: &str = "Products!A1:D1";
    /// Products header row
    pub const PRODUCTS_HEADERS: &[&str] = &["Name", "Price", "Quantity", "Description"];
    /// Orders header range
    pub const ORDERS_HEADER_RANGE: &str = "Orders!A1:H1";
    /// Orders header row
    pub const ORDERS_HEADERS: &[&str] = &[
        "Fullname", "Phone", "Product", "Quantity", "Total", "Address", "Note", "Status",
    ];
    /// Status written for new orders
    pub const DEFAULT_ORDER_STATUS: &str = "Pending";
    /// `ai_behaviour` value that enables the spreadsheet catalog
    pub const AI_BEHAVIOUR_WITH_SHEET: i32 = 1;
}

/// Conversation engine defaults
pub mod llm {
    /// Default Gemini model
    pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
    /// Upper bound on model round-trips inside one exchange
    pub const MAX_ROUND_TRIPS: usize = 8;
    /// `generationConfig.maxOutputTokens`
    pub const MAX_OUTPUT_TOKENS: u32 = 4096;
    /// `generationConfig.temperature`
    pub const TEMPERATURE: f32 = 0.7;
}

/// Request limits
pub mod limits {
    /// Maximum history length accepted by chat endpoints
    pub const MAX_CONVERSATION_MESSAGES: usize = 100;
    /// Maximum user message length in characters
    pub const MAX_MESSAGE_CHARS: usize = 500;
    /// Default timeout for third-party calls
    pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;
    /// Maximum accepted request body
    pub const MAX_BODY_BYTES: usize = 1024 * 1024;
}

/// Service identifiers for structured logging
pub mod service_names {
    /// Server binary
    pub const ALGECOM_SERVER: &str = "algecom-server";
    /// Google APIs
    pub const GOOGLE: &str = "Google";
    /// Facebook Graph API
    pub const FACEBOOK: &str = "Facebook";
    /// Gemini API
    pub const GEMINI: &str = "Gemini";
}

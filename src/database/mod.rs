// ABOUTME: Repository traits for users, Facebook links, businesses and page conversations
// ABOUTME: Keyed CRUD operations consumed by domain services, with in-memory implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Persistence
//!
//! Services depend on these traits only. Credentials live in the
//! [`CredentialStore`](crate::oauth2_client::CredentialStore), keyed by
//! `(user uid, "facebook")`, `(page id, "facebook_page")` and
//! `(user uid, "google")`; the repositories hold everything else.

/// `DashMap`/`RwLock` backed repositories
pub mod memory;

pub use memory::{InMemoryBusinessRepository, InMemoryUserRepository};

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::{Business, FacebookLink, User};

/// Accounts and their Facebook identities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account
    async fn create_user(&self, user: &User) -> AppResult<()>;

    /// Account by id
    async fn get_user(&self, uid: &str) -> AppResult<Option<User>>;

    /// Link of the Facebook user `facebook_id`
    async fn find_link_by_facebook_id(&self, facebook_id: &str) -> AppResult<Option<FacebookLink>>;

    /// Link of the account `user_uid`
    async fn find_link_by_user(&self, user_uid: &str) -> AppResult<Option<FacebookLink>>;

    /// Insert or replace the link of `link.facebook_id`
    async fn upsert_facebook_link(&self, link: &FacebookLink) -> AppResult<()>;
}

/// Business owned by an account, resolved from its page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBusiness {
    /// The business
    pub business: Business,
    /// Account that owns it
    pub owner_uid: String,
}

/// Businesses, their owners, pages, sheets and page conversations
#[async_trait]
pub trait BusinessRepository: Send + Sync {
    /// Insert a new business
    async fn create(&self, business: &Business) -> AppResult<()>;

    /// Grant `user_uid` access to the business
    async fn link_user(&self, business_uid: &str, user_uid: &str) -> AppResult<()>;

    /// Attach a Facebook page; fails if the page already belongs to a business
    async fn link_page(&self, business_uid: &str, page_id: &str) -> AppResult<()>;

    /// Attach the catalog spreadsheet
    async fn link_sheet(&self, business_uid: &str, sheet_id: &str) -> AppResult<()>;

    /// Business `business_uid` if `user_uid` may access it
    async fn find_by_user_and_uid(
        &self,
        user_uid: &str,
        business_uid: &str,
    ) -> AppResult<Option<Business>>;

    /// Businesses `user_uid` may access
    async fn list_by_user(&self, user_uid: &str) -> AppResult<Vec<Business>>;

    /// Business linked to `page_id`, with its owner
    async fn find_by_page(&self, page_id: &str) -> AppResult<Option<PageBusiness>>;

    /// Store the editable fields of `business`
    async fn update(&self, business: &Business) -> AppResult<()>;

    /// Conversation id recorded for `sender_id` on the business page
    async fn find_conversation(
        &self,
        business_uid: &str,
        sender_id: &str,
    ) -> AppResult<Option<String>>;

    /// Record the conversation id of `sender_id`
    async fn insert_conversation(
        &self,
        business_uid: &str,
        conversation_id: &str,
        sender_id: &str,
    ) -> AppResult<()>;
}

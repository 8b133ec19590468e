// ABOUTME: In-memory user and business repositories backed by DashMap and RwLock
// ABOUTME: Used by the server binary and tests; state is lost on restart
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;

use super::{BusinessRepository, PageBusiness, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{Business, FacebookLink, User};

/// `DashMap` backed [`UserRepository`]
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
    links: DashMap<String, FacebookLink>,
}

impl InMemoryUserRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> AppResult<()> {
        if self.users.contains_key(&user.uid) {
            return Err(AppError::already_exists(format!(
                "User '{}' already exists",
                user.uid
            )));
        }
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> AppResult<Option<User>> {
        Ok(self.users.get(uid).map(|entry| entry.value().clone()))
    }

    async fn find_link_by_facebook_id(&self, facebook_id: &str) -> AppResult<Option<FacebookLink>> {
        Ok(self.links.get(facebook_id).map(|entry| entry.value().clone()))
    }

    async fn find_link_by_user(&self, user_uid: &str) -> AppResult<Option<FacebookLink>> {
        Ok(self
            .links
            .iter()
            .find(|entry| entry.value().user_uid == user_uid)
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_facebook_link(&self, link: &FacebookLink) -> AppResult<()> {
        self.links.insert(link.facebook_id.clone(), link.clone());
        if let Some(mut user) = self.users.get_mut(&link.user_uid) {
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BusinessTables {
    businesses: HashMap<String, Business>,
    /// business uid -> user uids
    members: HashMap<String, HashSet<String>>,
    /// page id -> business uid
    pages: HashMap<String, String>,
    /// (business uid, sender id) -> conversation id
    conversations: HashMap<(String, String), String>,
}

impl BusinessTables {
    fn business_mut(&mut self, business_uid: &str) -> AppResult<&mut Business> {
        self.businesses
            .get_mut(business_uid)
            .ok_or_else(|| AppError::not_found(format!("Business '{business_uid}'")))
    }

    fn is_member(&self, business_uid: &str, user_uid: &str) -> bool {
        self.members
            .get(business_uid)
            .is_some_and(|users| users.contains(user_uid))
    }
}

/// `RwLock` backed [`BusinessRepository`]
///
/// All tables sit behind one lock so page links are checked and written atomically.
#[derive(Debug, Default)]
pub struct InMemoryBusinessRepository {
    tables: RwLock<BusinessTables>,
}

impl InMemoryBusinessRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusinessRepository for InMemoryBusinessRepository {
    async fn create(&self, business: &Business) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.businesses.contains_key(&business.uid) {
            return Err(AppError::already_exists(format!(
                "Business '{}' already exists",
                business.uid
            )));
        }
        tables
            .businesses
            .insert(business.uid.clone(), business.clone());
        Ok(())
    }

    async fn link_user(&self, business_uid: &str, user_uid: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.business_mut(business_uid)?;
        tables
            .members
            .entry(business_uid.to_owned())
            .or_default()
            .insert(user_uid.to_owned());
        Ok(())
    }

    async fn link_page(&self, business_uid: &str, page_id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(owner) = tables.pages.get(page_id) {
            return Err(AppError::already_exists(format!(
                "Facebook page with ID \"{page_id}\" is already linked to business \"{owner}\"."
            )));
        }
        tables.business_mut(business_uid)?.facebook_page_id = Some(page_id.to_owned());
        tables
            .pages
            .insert(page_id.to_owned(), business_uid.to_owned());
        Ok(())
    }

    async fn link_sheet(&self, business_uid: &str, sheet_id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let business = tables.business_mut(business_uid)?;
        business.google_sheet_id = Some(sheet_id.to_owned());
        business.updated_at = Utc::now();
        Ok(())
    }

    async fn find_by_user_and_uid(
        &self,
        user_uid: &str,
        business_uid: &str,
    ) -> AppResult<Option<Business>> {
        let tables = self.tables.read().await;
        if !tables.is_member(business_uid, user_uid) {
            return Ok(None);
        }
        Ok(tables.businesses.get(business_uid).cloned())
    }

    async fn list_by_user(&self, user_uid: &str) -> AppResult<Vec<Business>> {
        let tables = self.tables.read().await;
        let mut businesses: Vec<Business> = tables
            .businesses
            .values()
            .filter(|b| tables.is_member(&b.uid, user_uid))
            .cloned()
            .collect();
        businesses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(businesses)
    }

    async fn find_by_page(&self, page_id: &str) -> AppResult<Option<PageBusiness>> {
        let tables = self.tables.read().await;
        let Some(business_uid) = tables.pages.get(page_id) else {
            return Ok(None);
        };
        let Some(business) = tables.businesses.get(business_uid) else {
            return Ok(None);
        };
        let owner_uid = tables
            .members
            .get(business_uid)
            .and_then(|users| users.iter().min().cloned());

        Ok(owner_uid.map(|owner_uid| PageBusiness {
            business: business.clone(),
            owner_uid,
        }))
    }

    async fn update(&self, business: &Business) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.business_mut(&business.uid)?;
        stored.ai_behaviour = business.ai_behaviour;
        stored.ai_system_prompt.clone_from(&business.ai_system_prompt);
        stored.status = business.status;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn find_conversation(
        &self,
        business_uid: &str,
        sender_id: &str,
    ) -> AppResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .get(&(business_uid.to_owned(), sender_id.to_owned()))
            .cloned())
    }

    async fn insert_conversation(
        &self,
        business_uid: &str,
        conversation_id: &str,
        sender_id: &str,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.conversations.insert(
            (business_uid.to_owned(), sender_id.to_owned()),
            conversation_id.to_owned(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_facebook_links() {
        let repo = InMemoryUserRepository::new();
        let user = User::new();
        repo.create_user(&user).await.unwrap();
        assert!(repo.create_user(&user).await.is_err());

        let link = FacebookLink {
            user_uid: user.uid.clone(),
            facebook_id: "fb-1".to_owned(),
        };
        repo.upsert_facebook_link(&link).await.unwrap();

        assert_eq!(repo.find_link_by_facebook_id("fb-1").await.unwrap(), Some(link.clone()));
        assert_eq!(repo.find_link_by_user(&user.uid).await.unwrap(), Some(link));
        assert!(repo.find_link_by_user("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_business_membership_and_pages() {
        let repo = InMemoryBusinessRepository::new();
        let business = Business::new(0);
        repo.create(&business).await.unwrap();
        repo.link_user(&business.uid, "owner").await.unwrap();
        repo.link_page(&business.uid, "page-1").await.unwrap();

        let other = Business::new(0);
        repo.create(&other).await.unwrap();
        let duplicate = repo.link_page(&other.uid, "page-1").await;
        assert!(duplicate.unwrap_err().message.contains("already linked"));

        assert!(repo
            .find_by_user_and_uid("stranger", &business.uid)
            .await
            .unwrap()
            .is_none());
        let found = repo.find_by_page("page-1").await.unwrap().unwrap();
        assert_eq!(found.owner_uid, "owner");
        assert_eq!(found.business.facebook_page_id.as_deref(), Some("page-1"));
        assert_eq!(repo.list_by_user("owner").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conversations() {
        let repo = InMemoryBusinessRepository::new();
        assert!(repo.find_conversation("b", "s").await.unwrap().is_none());
        repo.insert_conversation("b", "t_123", "s").await.unwrap();
        assert_eq!(
            repo.find_conversation("b", "s").await.unwrap().as_deref(),
            Some("t_123")
        );
    }
}

// ABOUTME: User domain service: Facebook login, profile lookup, page listing and Google connection
// ABOUTME: Keeps Facebook and Google credentials in the credential store keyed by user uid
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::Platform;
use crate::constants::providers;
use crate::database::UserRepository;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{FacebookLink, User};
use crate::oauth2_client::{Credential, CredentialKey, CredentialStore};
use crate::providers::{FacebookClient, FacebookPage, FacebookUser, GoogleSheetsClient, GoogleUser};

/// Result of a Facebook login
#[derive(Debug, Clone)]
pub struct FacebookLogin {
    /// Account id, created on first login
    pub uid: String,
    /// Facebook profile
    pub facebook: FacebookUser,
    /// Long-lived, verified user credential
    pub credential: Credential,
}

/// Profile returned by `GET /user`
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// Account id
    pub uid: String,
    /// Facebook profile for Facebook sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<FacebookUser>,
    /// Connected Google account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleUser>,
    /// Account creation time, for non-Facebook sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Account update time, for non-Facebook sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page or all pages of the user
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserPages {
    /// `?id=` was given
    One(FacebookPage),
    /// Every page the user manages
    Many(Vec<FacebookPage>),
}

/// Account operations
pub struct UserService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialStore>,
    facebook: Arc<FacebookClient>,
    google: Arc<GoogleSheetsClient>,
}

impl UserService {
    /// Create the service
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialStore>,
        facebook: Arc<FacebookClient>,
        google: Arc<GoogleSheetsClient>,
    ) -> Self {
        Self {
            users,
            credentials,
            facebook,
            google,
        }
    }

    /// Log in with a short-lived Facebook user token
    ///
    /// The token is exchanged for a verified long-lived one; the account is
    /// created on first login and the credential is stored either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` when Facebook rejects the token
    #[instrument(skip(self, token))]
    pub async fn login_with_facebook(&self, token: &str) -> AppResult<FacebookLogin> {
        if token.trim().is_empty() {
            return Err(AppError::invalid_input("Facebook token is required"));
        }

        let facebook = self.facebook.get_user(token).await?;
        let credential = self
            .facebook
            .exchange_and_verify_token(token, providers::FACEBOOK)
            .await?;

        let uid = if let Some(link) = self.users.find_link_by_facebook_id(&facebook.id).await? {
            link.user_uid
        } else {
            let user = User::new();
            self.users.create_user(&user).await?;
            info!(uid = %user.uid, "created account for new Facebook user");
            user.uid
        };

        self.users
            .upsert_facebook_link(&FacebookLink {
                user_uid: uid.clone(),
                facebook_id: facebook.id.clone(),
            })
            .await?;
        self.credentials
            .persist(&CredentialKey::new(&uid, providers::FACEBOOK), credential.clone())
            .await?;
        AppLogger::log_oauth_event(&uid, providers::FACEBOOK, "login", true);

        Ok(FacebookLogin {
            uid,
            facebook,
            credential,
        })
    }

    /// Profile of the session user
    ///
    /// # Errors
    ///
    /// Returns an error if a linked provider cannot be reached
    pub async fn profile(&self, uid: &str, platform: Platform) -> AppResult<UserProfile> {
        let google = self.google_user(uid).await?;

        if platform == Platform::Facebook {
            let token = self.facebook_token(uid).await?;
            let facebook = self.facebook.get_user(&token).await?;
            return Ok(UserProfile {
                uid: uid.to_owned(),
                facebook: Some(facebook),
                google,
                created_at: None,
                updated_at: None,
            });
        }

        let user = self
            .users
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{uid}'")))?;
        Ok(UserProfile {
            uid: user.uid,
            facebook: None,
            google,
            created_at: Some(user.created_at),
            updated_at: Some(user.updated_at),
        })
    }

    /// Pages the user manages, or the page `page_id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user has no Facebook credential
    pub async fn facebook_pages(&self, uid: &str, page_id: Option<&str>) -> AppResult<UserPages> {
        let token = self.facebook_token(uid).await?;
        match page_id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(UserPages::One(self.facebook.get_page(&token, id, false).await?)),
            None => Ok(UserPages::Many(self.facebook.get_pages(&token).await?)),
        }
    }

    /// Connect a Google account from an authorization code
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty code, or the token endpoint's error
    #[instrument(skip(self, code))]
    pub async fn connect_google(&self, uid: &str, code: &str) -> AppResult<GoogleUser> {
        if code.trim().is_empty() {
            return Err(AppError::invalid_input(
                "Unable to connect to Google. Missing credentials.",
            ));
        }

        let key = CredentialKey::new(uid, providers::GOOGLE);
        let mut credential = self.google.exchange_code_for_tokens(code).await?;
        if credential.refresh_token.is_none() {
            if let Some(previous) = self.credentials.load(&key).await? {
                credential.refresh_token = previous.refresh_token;
            }
        }
        self.credentials.persist(&key, credential).await?;
        AppLogger::log_oauth_event(uid, providers::GOOGLE, "connect", true);

        self.google.get_user_info(uid).await
    }

    /// Connected Google account, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the stored credential is rejected
    pub async fn google_user(&self, uid: &str) -> AppResult<Option<GoogleUser>> {
        let key = CredentialKey::new(uid, providers::GOOGLE);
        if self.credentials.load(&key).await?.is_none() {
            return Ok(None);
        }
        self.google.get_user_info(uid).await.map(Some)
    }

    async fn facebook_token(&self, uid: &str) -> AppResult<String> {
        self.credentials
            .load(&CredentialKey::new(uid, providers::FACEBOOK))
            .await?
            .map(|c| c.access_token)
            .ok_or_else(|| AppError::not_found(format!("Facebook account of user '{uid}'")))
    }
}

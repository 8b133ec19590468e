// ABOUTME: Shared server resources wiring stores, provider clients, the model and services
// ABOUTME: Built once at startup and handed to every route group as Arc<ServerResources>
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Server Resources
//!
//! Every dependency is constructed here and injected through constructors;
//! route handlers only reach services through [`ServerResources`].

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::auth::{Platform, SessionSigner};
use crate::config::ServerConfig;
use crate::constants::routes::{API_PREFIX, PUBLIC_ROUTES};
use crate::conversation::{ConversationEngine, EngineConfig};
use crate::database::{
    BusinessRepository, InMemoryBusinessRepository, InMemoryUserRepository, UserRepository,
};
use crate::llm::{GeminiProvider, GenerativeModel};
use crate::middleware::{PublicRoutes, SessionGuard};
use crate::oauth2_client::{CredentialRotator, CredentialStore, InMemoryCredentialStore};
use crate::providers::{FacebookClient, GoogleSheetsClient};
use crate::services::{BusinessService, TokenSweeper, UserService};

/// Persistence backends
#[derive(Clone)]
pub struct Stores {
    /// Provider credentials
    pub credentials: Arc<dyn CredentialStore>,
    /// Users and Facebook links
    pub users: Arc<dyn UserRepository>,
    /// Businesses, page links and conversations
    pub businesses: Arc<dyn BusinessRepository>,
}

impl Stores {
    /// Process-local stores
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            businesses: Arc::new(InMemoryBusinessRepository::new()),
        }
    }
}

/// Everything the HTTP layer needs
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Persistence backends
    pub stores: Stores,
    /// Serialized refresh-and-persist over the credential store
    pub rotator: Arc<CredentialRotator>,
    /// Facebook Graph client
    pub facebook: Arc<FacebookClient>,
    /// Google OAuth and Sheets client
    pub google: Arc<GoogleSheetsClient>,
    /// Generative model behind the agent
    pub model: Arc<dyn GenerativeModel>,
    /// Tool-calling conversation loop
    pub engine: Arc<ConversationEngine>,
    /// Session verification and renewal
    pub guard: Arc<SessionGuard>,
    /// Account operations
    pub users: Arc<UserService>,
    /// Business operations and agent conversations
    pub businesses: Arc<BusinessService>,
    /// Credential refresh sweeps
    pub sweeper: Arc<TokenSweeper>,
    /// Cancelled on shutdown; in-flight exchanges derive child tokens
    pub shutdown: CancellationToken,
}

impl ServerResources {
    /// Wire in-memory stores and the Gemini model from `config`
    #[must_use]
    pub fn from_config(config: ServerConfig) -> Self {
        let model = Arc::new(GeminiProvider::new(&config.gemini, config.upstream_timeout_secs));
        Self::new(Arc::new(config), Stores::in_memory(), model)
    }

    /// Wire resources around the given stores and model
    #[must_use]
    pub fn new(config: Arc<ServerConfig>, stores: Stores, model: Arc<dyn GenerativeModel>) -> Self {
        let shutdown = CancellationToken::new();
        let rotator = Arc::new(CredentialRotator::new(
            stores.credentials.clone(),
            config.upstream_timeout(),
        ));

        let facebook = Arc::new(FacebookClient::new(
            &config.facebook,
            config.upstream_timeout_secs,
        ));
        let google = Arc::new(GoogleSheetsClient::new(
            &config.google,
            rotator.clone(),
            config.upstream_timeout(),
        ));

        let engine = Arc::new(ConversationEngine::new(
            model.clone(),
            EngineConfig::from_gemini(&config.gemini, config.upstream_timeout()),
        ));

        let guard = Arc::new(
            SessionGuard::new(
                SessionSigner::new(&config.session.jwt_secret, config.session.ttl_secs),
                config.session.renewal_threshold_secs,
                PublicRoutes::new(API_PREFIX, PUBLIC_ROUTES),
                rotator.clone(),
            )
            .with_refresher(Platform::Facebook, facebook.clone()),
        );

        let users = Arc::new(UserService::new(
            stores.users.clone(),
            stores.credentials.clone(),
            facebook.clone(),
            google.clone(),
        ));
        let businesses = Arc::new(BusinessService::new(
            stores.businesses.clone(),
            stores.credentials.clone(),
            facebook.clone(),
            google.clone(),
            engine.clone(),
            config.app.clone(),
            shutdown.clone(),
        ));
        let sweeper = Arc::new(TokenSweeper::new(
            rotator.clone(),
            facebook.clone(),
            google.clone(),
        ));

        info!(model = %model.name(), "server resources initialized");

        Self {
            config,
            stores,
            rotator,
            facebook,
            google,
            model,
            engine,
            guard,
            users,
            businesses,
            sweeper,
            shutdown,
        }
    }
}

impl fmt::Debug for ServerResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerResources")
            .field("model", &self.model.name())
            .field("http_port", &self.config.http_port)
            .finish_non_exhaustive()
    }
}

// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses provider credentials, session policy, model settings and CORS origins
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{limits, llm, oauth, ports, session, urls};

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Deployed service
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Session cookie signing and renewal policy
#[derive(Clone)]
pub struct SessionConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Renew when the embedded credential has less than this left
    pub renewal_threshold_secs: i64,
    /// Lifetime of a freshly signed session token
    pub ttl_secs: i64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("renewal_threshold_secs", &self.renewal_threshold_secs)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Facebook app credentials and Graph API location
#[derive(Clone)]
pub struct FacebookConfig {
    /// App id
    pub client_id: String,
    /// App secret
    pub client_secret: String,
    /// Token Facebook echoes during webhook verification
    pub verify_webhook_token: String,
    /// Graph API version, e.g. `v22.0`
    pub api_version: String,
    /// Graph API base URL
    pub graph_base_url: String,
}

impl fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("verify_webhook_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("graph_base_url", &self.graph_base_url)
            .finish()
    }
}

/// Google OAuth client and API endpoints
#[derive(Clone)]
pub struct GoogleConfig {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered for the consent screen
    pub redirect_uri: String,
    /// Token endpoint base (`/token` is appended)
    pub oauth_base_url: String,
    /// Sheets API base
    pub sheets_base_url: String,
    /// Userinfo endpoint
    pub userinfo_url: String,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("oauth_base_url", &self.oauth_base_url)
            .field("sheets_base_url", &self.sheets_base_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

/// Gemini model configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Round-trip bound per exchange
    pub max_round_trips: usize,
    /// `generationConfig.maxOutputTokens`
    pub max_output_tokens: u32,
    /// `generationConfig.temperature`
    pub temperature: f32,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_round_trips", &self.max_round_trips)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Public application identity
#[derive(Debug, Clone)]
pub struct AppInfoConfig {
    /// Product name used in greetings
    pub name: String,
    /// System prompt for the public chat test endpoint
    pub information: String,
}

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listener port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Session policy
    pub session: SessionConfig,
    /// Facebook app
    pub facebook: FacebookConfig,
    /// Google OAuth client
    pub google: GoogleConfig,
    /// Gemini model
    pub gemini: GeminiConfig,
    /// Timeout applied to every third-party call
    pub upstream_timeout_secs: u64,
    /// Raw `CORS_ORIGIN` value
    pub cors_origins: String,
    /// Application identity
    pub app: AppInfoConfig,
    /// Shared secret for the cron sweep endpoints
    pub cron_secret: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or a numeric variable cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let cors_origins = env_var_or("CORS_ORIGIN", "*");
        let redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| default_google_redirect_uri(&parse_origins(&cors_origins)));

        let config = Self {
            http_port: parse_env("HTTP_PORT", ports::DEFAULT_HTTP_PORT)?,
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            session: SessionConfig {
                jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
                renewal_threshold_secs: parse_env(
                    "SESSION_RENEWAL_THRESHOLD_SECS",
                    session::RENEWAL_THRESHOLD_SECS,
                )?,
                ttl_secs: parse_env("SESSION_TTL_SECS", session::SESSION_TTL_SECS)?,
            },
            facebook: FacebookConfig {
                client_id: env_var_or("FB_CLIENT_ID", ""),
                client_secret: env_var_or("FB_CLIENT_SECRET", ""),
                verify_webhook_token: env_var_or("FB_VERIFY_WEBHOOK_TOKEN", ""),
                api_version: env_var_or("FB_API_VERSION", oauth::FACEBOOK_API_VERSION),
                graph_base_url: env_var_or("FB_GRAPH_BASE_URL", urls::FACEBOOK_GRAPH_BASE),
            },
            google: GoogleConfig {
                client_id: env_var_or("GOOGLE_CLIENT_ID", ""),
                client_secret: env_var_or("GOOGLE_CLIENT_SECRET", ""),
                redirect_uri,
                oauth_base_url: env_var_or("GOOGLE_OAUTH_BASE_URL", urls::GOOGLE_OAUTH_BASE),
                sheets_base_url: env_var_or("GOOGLE_SHEETS_BASE_URL", urls::GOOGLE_SHEETS_BASE),
                userinfo_url: env_var_or("GOOGLE_USERINFO_URL", urls::GOOGLE_USERINFO),
            },
            gemini: GeminiConfig {
                api_key: env_var_or("GEMINI_API_KEY", ""),
                model: env_var_or("GEMINI_MODEL", llm::DEFAULT_MODEL),
                base_url: env_var_or("GEMINI_BASE_URL", urls::GEMINI_BASE),
                max_round_trips: parse_env("LLM_MAX_ROUND_TRIPS", llm::MAX_ROUND_TRIPS)?,
                max_output_tokens: parse_env("LLM_MAX_OUTPUT_TOKENS", llm::MAX_OUTPUT_TOKENS)?,
                temperature: parse_env("LLM_TEMPERATURE", llm::TEMPERATURE)?,
            },
            upstream_timeout_secs: parse_env(
                "UPSTREAM_TIMEOUT_SECS",
                limits::UPSTREAM_TIMEOUT_SECS,
            )?,
            cors_origins,
            app: AppInfoConfig {
                name: env_var_or("APP_NAME", "Algecom"),
                information: env_var_or(
                    "APP_INFORMATION",
                    "You are the Algecom assistant. Answer questions about the Algecom platform.",
                ),
            },
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.session.jwt_secret.is_empty() {
            return Err(anyhow::anyhow!("JWT_SECRET cannot be empty"));
        }
        if self.session.ttl_secs <= 0 || self.session.renewal_threshold_secs < 0 {
            return Err(anyhow::anyhow!(
                "SESSION_TTL_SECS must be positive and SESSION_RENEWAL_THRESHOLD_SECS non-negative"
            ));
        }
        if self.gemini.max_round_trips == 0 {
            return Err(anyhow::anyhow!("LLM_MAX_ROUND_TRIPS must be at least 1"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPSTREAM_TIMEOUT_SECS must be at least 1"));
        }

        if self.facebook.client_id.is_empty() || self.facebook.client_secret.is_empty() {
            warn!("Facebook login is unavailable: FB_CLIENT_ID or FB_CLIENT_SECRET missing");
        }
        if self.google.client_id.is_empty() || self.google.client_secret.is_empty() {
            warn!("Google Sheets is unavailable: GOOGLE_CLIENT_ID or GOOGLE_CLIENT_SECRET missing");
        }
        if self.gemini.api_key.is_empty() {
            warn!("GEMINI_API_KEY missing: chat endpoints will fail");
        }
        if self.environment.is_production() && self.cron_secret.is_none() {
            warn!("CRON_SECRET not set: token sweep endpoints are unauthenticated");
        }

        Ok(())
    }

    /// Timeout applied to third-party calls
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Parsed CORS origin list
    #[must_use]
    pub fn cors_origin_list(&self) -> Vec<String> {
        parse_origins(&self.cors_origins)
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Algecom Server Configuration:\n\
             - HTTP Port: {}\n\
             - Environment: {}\n\
             - Session TTL: {}s (renew below {}s)\n\
             - Facebook: {} (Graph {})\n\
             - Google Sheets: {}\n\
             - Gemini Model: {} (max {} round-trips)\n\
             - Upstream Timeout: {}s\n\
             - CORS Origins: {}\n\
             - Cron Secret: {}",
            self.http_port,
            self.environment,
            self.session.ttl_secs,
            self.session.renewal_threshold_secs,
            enabled(!self.facebook.client_id.is_empty()),
            self.facebook.api_version,
            enabled(!self.google.client_id.is_empty()),
            self.gemini.model,
            self.gemini.max_round_trips,
            self.upstream_timeout_secs,
            self.cors_origins,
            enabled(self.cron_secret.is_some()),
        )
    }
}

const fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// First origin containing `app.`, otherwise the first origin
fn default_google_redirect_uri(origins: &[String]) -> String {
    origins
        .iter()
        .find(|origin| origin.contains("app."))
        .or_else(|| origins.first())
        .filter(|origin| origin.as_str() != "*")
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com,"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn test_google_redirect_prefers_app_origin() {
        let origins = parse_origins("https://example.com,https://app.example.com");
        assert_eq!(
            default_google_redirect_uri(&origins),
            "https://app.example.com"
        );

        let origins = parse_origins("https://example.com,https://admin.example.com");
        assert_eq!(default_google_redirect_uri(&origins), "https://example.com");

        assert_eq!(default_google_redirect_uri(&parse_origins("*")), "");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("test"),
            Environment::Testing
        );
        assert_eq!(
            Environment::from_str_or_default("unknown"),
            Environment::Development
        );
    }
}

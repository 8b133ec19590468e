// ABOUTME: Session token claims and HS256 signing for the authToken cookie
// ABOUTME: Issues and verifies self-contained session tokens with detailed validation errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Session Tokens
//!
//! A session is a signed JWT carrying the user id, the login platform and the
//! platform credential itself. Its `exp` bounds the cookie; `expires_at`
//! tracks the embedded credential and drives sliding renewal in the session
//! guard.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{from_jwt_signing, AppResult};

/// Platform a user logged in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Facebook login; the embedded credential is a Facebook user token
    Facebook,
    /// Email login; the embedded token is opaque to the server
    Email,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Facebook => write!(f, "facebook"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// Claims of the session token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub uid: String,
    /// Login platform
    pub platform: Platform,
    /// Platform credential
    pub token: String,
    /// Unix time the embedded credential expires
    pub expires_at: i64,
    /// Re-sign the same credential on the next renewal instead of exchanging it
    #[serde(rename = "keepToken", default, skip_serializing_if = "Option::is_none")]
    pub keep_token: Option<bool>,
    /// Issued at (Unix time)
    #[serde(default)]
    pub iat: i64,
    /// Expiry of the session token itself (Unix time)
    #[serde(default)]
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for a freshly authenticated credential; `iat`/`exp` are set when signed
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        platform: Platform,
        token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            platform,
            token: token.into(),
            expires_at: expires_at.timestamp(),
            keep_token: None,
            iat: 0,
            exp: 0,
        }
    }

    /// Mark the credential as already fresh so the next renewal only re-signs
    #[must_use]
    pub const fn keep_token(mut self) -> Self {
        self.keep_token = Some(true);
        self
    }

    /// Whether the next renewal should re-sign without exchanging
    #[must_use]
    pub fn wants_keep_token(&self) -> bool {
        self.keep_token.unwrap_or(false)
    }

    /// Time the embedded credential has left
    #[must_use]
    pub fn credential_remaining(&self, now: DateTime<Utc>) -> Duration {
        Duration::seconds(self.expires_at - now.timestamp())
    }
}

impl fmt::Debug for SessionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClaims")
            .field("uid", &self.uid)
            .field("platform", &self.platform)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("keep_token", &self.keep_token)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Session token validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtValidationError {
    /// Token `exp` has passed
    #[error("Session token expired at {expired_at}")]
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Signature or algorithm check failed
    #[error("Session token is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Not a decodable JWT
    #[error("Session token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

/// Signed session token with the claims it carries
#[derive(Debug, Clone)]
pub struct SignedSession {
    /// Compact JWT
    pub token: String,
    /// Claims as signed
    pub claims: SessionClaims,
}

/// HS256 signer and verifier for session tokens
#[derive(Clone)]
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionSigner {
    /// Signer for `secret` issuing tokens valid for `ttl_secs`
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Session token lifetime
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claims` with `iat = now` and `exp = now + ttl`
    ///
    /// # Errors
    ///
    /// Returns an internal error if the claims cannot be encoded
    pub fn issue(&self, mut claims: SessionClaims, now: DateTime<Utc>) -> AppResult<SignedSession> {
        claims.iat = now.timestamp();
        claims.exp = (now + self.ttl).timestamp();

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(from_jwt_signing)?;

        debug!(uid = %claims.uid, exp = claims.exp, "issued session token");
        Ok(SignedSession { token, claims })
    }

    /// Verify signature and `exp` against `now`
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] if the token is malformed, its
    /// signature does not verify or it has expired
    pub fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| convert_jwt_error(&e))?;

        if now.timestamp() > claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
            warn!(uid = %claims.uid, "session token expired at {}", expired_at.to_rfc3339());
            return Err(JwtValidationError::TokenExpired { expired_at });
        }

        Ok(claims)
    }
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
            reason: "Token signature verification failed".to_owned(),
        },
        ErrorKind::InvalidAlgorithm => JwtValidationError::TokenInvalid {
            reason: "Unexpected signing algorithm".to_owned(),
        },
        ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
            details: "Token format is invalid".to_owned(),
        },
        ErrorKind::Base64(err) => JwtValidationError::TokenMalformed {
            details: format!("Token contains invalid base64: {err}"),
        },
        ErrorKind::Json(err) => JwtValidationError::TokenMalformed {
            details: format!("Token contains invalid JSON: {err}"),
        },
        ErrorKind::Utf8(err) => JwtValidationError::TokenMalformed {
            details: format!("Token contains invalid UTF-8: {err}"),
        },
        _ => JwtValidationError::TokenInvalid {
            reason: format!("Token validation failed: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(now: DateTime<Utc>) -> SessionClaims {
        SessionClaims::new("user-1", Platform::Facebook, "fb-token", now + Duration::days(30))
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = SessionSigner::new("test-secret", 3600);
        let now = Utc::now();

        let signed = signer.issue(claims(now).keep_token(), now).unwrap();
        let verified = signer.verify(&signed.token, now).unwrap();

        assert_eq!(verified.uid, "user-1");
        assert_eq!(verified.exp, now.timestamp() + 3600);
        assert!(verified.wants_keep_token());
    }

    #[test]
    fn test_keep_token_omitted_when_unset() {
        let value = serde_json::to_value(claims(Utc::now())).unwrap();
        assert!(value.get("keepToken").is_none());
        assert_eq!(value["platform"], "facebook");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let now = Utc::now();
        let signed = SessionSigner::new("a", 3600).issue(claims(now), now).unwrap();
        let result = SessionSigner::new("b", 3600).verify(&signed.token, now);
        assert!(matches!(result, Err(JwtValidationError::TokenInvalid { .. })));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = SessionSigner::new("test-secret", 60);
        let issued = Utc::now() - Duration::hours(1);
        let signed = signer.issue(claims(issued), issued).unwrap();

        let result = signer.verify(&signed.token, Utc::now());
        assert!(matches!(result, Err(JwtValidationError::TokenExpired { .. })));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = SessionSigner::new("s", 60).verify("not-a-jwt", Utc::now());
        assert!(matches!(result, Err(JwtValidationError::TokenMalformed { .. })));
    }
}

// ABOUTME: Secure cookie construction and parsing for the session token
// ABOUTME: Builds HttpOnly, Secure, SameSite=None cookies and reads them back from requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use axum::http::{header, HeaderMap, HeaderValue};

use crate::constants::session::COOKIE_NAME;

/// `SameSite` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Sent only on same-site requests
    Strict,
    /// Sent on top-level navigations
    Lax,
    /// Sent on cross-site requests; requires `Secure`
    None,
}

impl SameSite {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes of a `Set-Cookie` header
#[derive(Debug, Clone)]
pub struct SecureCookieConfig {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// `Max-Age` in seconds; `0` deletes the cookie
    pub max_age_secs: i64,
    /// `HttpOnly`
    pub http_only: bool,
    /// `Secure`
    pub secure: bool,
    /// `SameSite`
    pub same_site: SameSite,
    /// `Path`
    pub path: String,
}

impl SecureCookieConfig {
    /// Cross-site session cookie: `HttpOnly; Secure; SameSite=None; Path=/`
    #[must_use]
    pub fn new(name: String, value: String, max_age_secs: i64) -> Self {
        Self {
            name,
            value,
            max_age_secs: max_age_secs.max(0),
            http_only: true,
            secure: true,
            same_site: SameSite::None,
            path: "/".to_owned(),
        }
    }

    /// Render the `Set-Cookie` value
    #[must_use]
    pub fn build(&self) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name, self.value, self.path, self.max_age_secs
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        cookie
    }
}

/// Session cookie carrying `token` for `max_age_secs`
#[must_use]
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    SecureCookieConfig::new(COOKIE_NAME.to_owned(), token.to_owned(), max_age_secs).build()
}

/// Cookie that deletes the session
#[must_use]
pub fn clear_session_cookie() -> String {
    session_cookie("", 0)
}

/// Append a `Set-Cookie` header; values that are not valid header text are dropped
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.append(header::SET_COOKIE, value);
    }
}

/// Value of cookie `name` from the request `Cookie` headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}

// ABOUTME: Tests for environment-driven server configuration
// ABOUTME: Serialized because they mutate process environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use std::env;

use algecom_server::config::{Environment, ServerConfig};
use common::test_config;
use serial_test::serial;

const MANAGED_VARS: &[&str] = &[
    "JWT_SECRET",
    "HTTP_PORT",
    "ENVIRONMENT",
    "CORS_ORIGIN",
    "GOOGLE_REDIRECT_URI",
    "LLM_MAX_ROUND_TRIPS",
    "SESSION_RENEWAL_THRESHOLD_SECS",
    "SESSION_TTL_SECS",
    "CRON_SECRET",
    "GEMINI_MODEL",
];

fn clear_env() {
    for key in MANAGED_VARS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_jwt_secret_is_required() {
    clear_env();

    let error = ServerConfig::from_env().unwrap_err();

    assert!(format!("{error:#}").contains("JWT_SECRET"));
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    env::set_var("JWT_SECRET", "s3cret");

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8080);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.session.renewal_threshold_secs, 10 * 24 * 60 * 60);
    assert_eq!(config.session.ttl_secs, 60 * 24 * 60 * 60);
    assert_eq!(config.facebook.api_version, "v22.0");
    assert_eq!(config.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.gemini.max_round_trips, 8);
    assert_eq!(config.cors_origin_list(), vec!["*".to_owned()]);
    assert!(config.cron_secret.is_none());
    assert!(config.google.redirect_uri.is_empty());

    clear_env();
}

#[test]
#[serial]
fn test_overrides_and_redirect_from_origins() {
    clear_env();
    env::set_var("JWT_SECRET", "s3cret");
    env::set_var("HTTP_PORT", "9090");
    env::set_var("ENVIRONMENT", "production");
    env::set_var("CORS_ORIGIN", "https://www.example.com, https://app.example.com");
    env::set_var("LLM_MAX_ROUND_TRIPS", "4");
    env::set_var("CRON_SECRET", "cron");

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 9090);
    assert!(config.environment.is_production());
    assert_eq!(config.gemini.max_round_trips, 4);
    assert_eq!(config.google.redirect_uri, "https://app.example.com");
    assert_eq!(config.cron_secret.as_deref(), Some("cron"));
    assert!(!config.summary().contains("s3cret"));

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_number_is_rejected() {
    clear_env();
    env::set_var("JWT_SECRET", "s3cret");
    env::set_var("HTTP_PORT", "eighty");

    let error = ServerConfig::from_env().unwrap_err();

    assert!(format!("{error:#}").contains("HTTP_PORT"));
    clear_env();
}

#[test]
fn test_validate_rejects_unusable_values() {
    let mut config = test_config("http://localhost");
    assert!(config.validate().is_ok());

    config.gemini.max_round_trips = 0;
    assert!(config.validate().is_err());

    let mut config = test_config("http://localhost");
    config.session.jwt_secret = String::new();
    assert!(config.validate().is_err());

    let mut config = test_config("http://localhost");
    config.upstream_timeout_secs = 0;
    assert!(config.validate().is_err());
}

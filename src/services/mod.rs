// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Users, businesses, the spreadsheet catalog adapter and the token refresh sweep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Domain service layer
//!
//! Route handlers stay thin: they extract the session and payload, call one
//! service method and return its result for the envelope middleware.

/// Business onboarding, settings, catalog data and agent conversations
pub mod business;

/// Google Sheets backed catalog for the agent tools
pub mod catalog;

/// Scheduled credential refresh
pub mod token_sweep;

/// Facebook login, profile and Google connection
pub mod user;

pub use business::{BusinessInfo, BusinessService, CreateBusinessRequest, GoogleInfo};
pub use catalog::SheetCatalog;
pub use token_sweep::{FacebookSweep, SweepReport, TokenSweeper};
pub use user::{FacebookLogin, UserPages, UserProfile, UserService};

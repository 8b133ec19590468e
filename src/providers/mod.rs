// ABOUTME: Third-party integrations for Facebook pages and Google Sheets catalogs
// ABOUTME: Provider clients, upstream error classification and sheet row formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

/// Upstream call errors
pub mod errors;
/// Facebook Graph API client
pub mod facebook;
/// Google Sheets and userinfo client
pub mod google;
/// Spreadsheet row formatting
pub mod sheets;

pub use errors::ProviderCallError;
pub use facebook::{FacebookClient, FacebookPage, FacebookUser, PageMessage, TokenInfo};
pub use google::{GoogleSheetsClient, GoogleSpreadsheet, GoogleUser};
pub use sheets::{format_sheet_rows, SheetTable};

// ABOUTME: Google Sheets backed CatalogService bound to one business spreadsheet
// ABOUTME: Reads the Products and Orders sheets and appends orders with the owner's credential
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use async_trait::async_trait;

use crate::constants::sheets::{ORDERS, PRODUCTS};
use crate::errors::AppResult;
use crate::models::OrderRecord;
use crate::providers::{format_sheet_rows, GoogleSheetsClient, SheetTable};
use crate::tools::CatalogService;

/// Catalog spreadsheet of one business, accessed as its owner
pub struct SheetCatalog {
    google: Arc<GoogleSheetsClient>,
    owner_uid: String,
    spreadsheet_id: String,
}

impl SheetCatalog {
    /// Bind to `spreadsheet_id` owned by `owner_uid`
    #[must_use]
    pub fn new(
        google: Arc<GoogleSheetsClient>,
        owner_uid: impl Into<String>,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            google,
            owner_uid: owner_uid.into(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    async fn table(&self, sheet: &str) -> AppResult<SheetTable> {
        let raw = self
            .google
            .get_sheet(&self.owner_uid, &self.spreadsheet_id, sheet)
            .await?;
        Ok(format_sheet_rows(&raw))
    }
}

#[async_trait]
impl CatalogService for SheetCatalog {
    async fn list_products(&self) -> AppResult<SheetTable> {
        self.table(PRODUCTS).await
    }

    async fn list_orders(&self) -> AppResult<SheetTable> {
        self.table(ORDERS).await
    }

    async fn append_order(&self, order: &OrderRecord) -> AppResult<()> {
        self.google
            .append_order(&self.owner_uid, &self.spreadsheet_id, order)
            .await
    }
}

// ABOUTME: Converts raw spreadsheet values into keyed rows for API responses and tools
// ABOUTME: Normalizes header cells to camelCase keys and tags each row with its A1 id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Spreadsheet rendered as a header list plus keyed rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTable {
    /// `"Row"` followed by the raw header cells
    pub columns: Vec<String>,
    /// One object per data row: `row` (A1 id) plus one camelCase key per header
    pub rows: Vec<Map<String, Value>>,
}

impl SheetTable {
    /// Find the first row whose `key` equals `value`, ignoring case and surrounding spaces
    #[must_use]
    pub fn find_row(&self, key: &str, value: &str) -> Option<&Map<String, Value>> {
        let wanted = value.trim().to_lowercase();
        self.rows.iter().find(|row| {
            row.get(key)
                .and_then(Value::as_str)
                .is_some_and(|cell| cell.trim().to_lowercase() == wanted)
        })
    }
}

/// Header characters kept when building row keys
static HEADER_NOISE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").ok());

/// `"Unit Price ($)"` becomes `"unitPrice"`
#[must_use]
pub fn clean_header_name(header: &str) -> String {
    let trimmed = header.trim();
    let stripped = HEADER_NOISE
        .as_ref()
        .map_or(Cow::Borrowed(trimmed), |re| re.replace_all(trimmed, ""));

    stripped
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            let lower = word.to_lowercase();
            if index == 0 {
                return lower;
            }
            let mut chars = lower.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

/// Shape raw `values` (first row = headers) into a [`SheetTable`]
///
/// Row ids follow the sheet: the first data row is `A2`. Missing cells become
/// empty strings.
#[must_use]
pub fn format_sheet_rows(raw: &[Vec<String>]) -> SheetTable {
    let Some((headers, data)) = raw.split_first() else {
        return SheetTable::default();
    };

    let keys: Vec<String> = headers.iter().map(|h| clean_header_name(h)).collect();

    let rows = data
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut formatted = Map::new();
            formatted.insert("row".to_owned(), Value::String(format!("A{}", index + 2)));
            for (column, key) in keys.iter().enumerate() {
                let cell = row.get(column).cloned().unwrap_or_default();
                formatted.insert(key.clone(), Value::String(cell));
            }
            formatted
        })
        .collect();

    let mut columns = Vec::with_capacity(headers.len() + 1);
    columns.push("Row".to_owned());
    columns.extend(headers.iter().cloned());

    SheetTable { columns, rows }
}

// ABOUTME: Business tools the conversation engine offers to the model
// ABOUTME: Trait, schema validation, per-exchange registry and the spreadsheet catalog tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Tools
//!
//! Tools are built per exchange and bound to one business. The model sees
//! them as function declarations; calls are resolved and validated by the
//! [`ToolRegistry`].

/// Spreadsheet catalog tools
pub mod catalog;
/// Per-exchange tool registry
pub mod registry;
/// The `BusinessTool` trait
pub mod traits;
/// Argument validation against tool schemas
pub mod validation;

pub use catalog::{
    catalog_registry, CatalogService, CheckInventoryTool, CheckOrdersTool, PlaceOrderTool,
};
pub use registry::ToolRegistry;
pub use traits::BusinessTool;
pub use validation::validate_arguments;

// ABOUTME: Core error types and constants for the Algecom API platform
// ABOUTME: Foundation crate with unified error handling and domain constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # Algecom Core
//!
//! Foundation crate providing shared types and constants for the Algecom API.
//! It changes rarely, which keeps incremental builds of the server crate cheap.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode` and `ToolError`
//! - **constants**: Application-wide constants organized by domain

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

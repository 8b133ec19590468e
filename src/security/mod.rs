// ABOUTME: Security helpers shared by the HTTP layer
// ABOUTME: Session cookie construction and parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

/// Secure cookie utilities
pub mod cookies;

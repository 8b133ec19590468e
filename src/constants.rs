// ABOUTME: System-wide constants re-exported from algecom-core
// ABOUTME: Keeps crate::constants as the import path used throughout the server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Constants Module
//!
//! Domain constants live in `algecom-core`; this module re-exports them so the
//! server code can use `crate::constants::session` and friends.

pub use algecom_core::constants::*;

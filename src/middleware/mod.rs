// ABOUTME: HTTP middleware for sessions, response envelopes, CORS and request tracing
// ABOUTME: Provides the session guard, the {success, data} envelope and request spans
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

pub mod cors;
pub mod envelope;
pub mod session;
pub mod tracing;

// CORS configuration
pub use cors::setup_cors;

// Response envelope
pub use envelope::envelope_middleware;

// Session guard
pub use session::{
    session_guard_middleware, AuthenticatedSession, GuardOutcome, PublicRoutes, SessionGuard,
};

// Request tracing
pub use self::tracing::{create_exchange_span, create_request_span, request_id};

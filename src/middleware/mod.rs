//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Enforce role requirements
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)

/// API key authentication and the admin role gate
pub mod auth;

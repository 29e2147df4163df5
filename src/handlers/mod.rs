//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Application lifecycle endpoints
pub mod applications;
/// Health check endpoint
pub mod health;
/// Recharge orders and the gateway webhook
pub mod payments;
/// Scheme catalog endpoints
pub mod schemes;
/// User provisioning endpoint
pub mod users;
/// Wallet and statement endpoints
pub mod wallet;

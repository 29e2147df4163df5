//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response types of the HTTP API.

/// API key authentication model
pub mod api_key;
/// Scheme applications and decision types
pub mod application;
/// Paise amounts and formatting
pub mod money;
/// Gateway orders and webhook payloads
pub mod payment;
/// Government-service scheme catalog
pub mod scheme;
/// Wallet ledger entries
pub mod transaction;
/// Platform users and roles
pub mod user;
/// Per-user wallets
pub mod wallet;

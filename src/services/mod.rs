//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

/// Review-time money side effects: payment collection, commission, refunds
pub mod approval_service;
/// Gateway recharge orders and webhook processing
pub mod payment_service;
/// Ledger primitives: wallets, debits, credits, statements
pub mod wallet_service;

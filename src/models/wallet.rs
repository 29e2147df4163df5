//! Wallet data model.
//!
//! Every user has at most one wallet, created lazily the first time money
//! needs to move for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a wallet record from the database.
///
/// # Database Table
///
/// Maps to the `wallets` table, one row per user (`user_id` is unique).
///
/// # Balance Storage
///
/// Balances are stored as `i64` paise to avoid floating-point precision
/// issues, and a database CHECK constraint keeps them non-negative. Every
/// debit additionally re-checks the balance inside its UPDATE, so the
/// constraint is a backstop rather than the enforcement point.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// Owning user (unique per wallet)
    pub user_id: Uuid,

    /// Current balance in paise (never negative)
    pub balance_paise: i64,

    /// Timestamp when the wallet was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of last balance update
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for the wallet statement endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatementQuery {
    /// Maximum entries to return; normalized to 1..=200, default 50
    pub limit: Option<i64>,
}

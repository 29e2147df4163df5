//! Wallet ledger entries.
//!
//! This module defines:
//! - `TransactionType` / `TransactionStatus`: Postgres enums for ledger rows
//! - `Transaction`: Database entity representing one ledger entry
//!
//! The ledger is append-only. Rows are inserted exactly once, always with
//! status `COMPLETED`, and never updated or deleted afterwards. The wallet
//! balance is the authoritative figure; the ledger explains it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of money movement a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Gateway recharge credited to the wallet
    Deposit,
    /// Money paid out of the platform (reserved; nothing emits this today)
    Withdrawal,
    /// Debit collected for a scheme application
    SchemePayment,
    /// Credit returned for a rejected, already-paid application
    Refund,
    /// Retailer commission credit on approval
    Commission,
}

/// Lifecycle state of a ledger entry.
///
/// The service only ever writes `Completed`: balance change and ledger row
/// commit in the same database transaction, so there is no window in which
/// a row could be pending. The remaining states exist for imports and
/// gateway reconciliation tooling that shares this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Represents a ledger entry from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each entry:
/// - Belongs to one wallet and its owning user
/// - Stores a signed amount in paise (negative = money left the wallet)
/// - Optionally carries a `reference` linking it to the application or
///   gateway order that caused it
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique identifier for this ledger entry
    pub id: Uuid,

    /// Wallet whose balance this entry changed
    pub wallet_id: Uuid,

    /// Owner of that wallet
    pub user_id: Uuid,

    /// Kind of movement
    pub transaction_type: TransactionType,

    /// Signed amount in paise
    ///
    /// Positive for credits, negative for debits, never zero (enforced by a
    /// CHECK constraint).
    pub amount_paise: i64,

    /// Entry status (always `COMPLETED` for rows written by this service)
    pub status: TransactionStatus,

    /// Human-readable description
    pub description: Option<String>,

    /// Identifier of the event that caused this entry
    ///
    /// Application id for SCHEME_PAYMENT / REFUND / COMMISSION, gateway
    /// order id for DEPOSIT. A payment and its refund share one reference,
    /// which is how statements pair them up.
    pub reference: Option<String>,

    /// Additional context (gateway payload extracts and the like)
    pub metadata: Option<serde_json::Value>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

//! Scheme applications and the review decision types.
//!
//! This module defines:
//! - `ApplicationStatus` / `PaymentState`: the two state machines every
//!   application moves through
//! - `Application`: Database entity representing an application
//! - Request/response types for submission and the admin decision endpoint

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::Transaction;
use super::wallet::Wallet;

/// Review state of an application.
///
/// Transitions are one-way: a PENDING application is decided exactly once,
/// and only service-delivery tooling moves APPROVED on to COMPLETED. Every
/// status write re-checks the expected prior state in its WHERE clause, so
/// two concurrent decisions cannot both land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ApplicationStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }
}

/// Displays as the wire literal, for error messages.
impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Completed => "COMPLETED",
        })
    }
}

/// Payment state of an application, independent of its review state.
///
/// An application can be paid before or during approval, and refunded only
/// after rejection. PAID is the guard for both sides: collection claims
/// PENDING → PAID, a refund claims PAID → REFUNDED, and each claim is a
/// conditional update so it can succeed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_state", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Paid,
    Refunded,
}

impl PaymentState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PaymentState) -> bool {
        use PaymentState::*;
        matches!((self, next), (Pending, Paid) | (Paid, Refunded))
    }
}

/// Represents an application record from the database.
///
/// # Database Table
///
/// Maps to the `applications` table. Amounts snapshot the scheme at
/// submission time:
/// - `amount_paise` / `base_amount_paise`: the scheme price
/// - `total_amount_paise`: price plus service charge, the sum actually
///   debited from (and refunded to) the applicant's wallet
///
/// Commission fields are written during approval: the rate in force at that
/// moment, the rounded amount, and the `commission_paid` flag that makes the
/// payout idempotent.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Application {
    /// Unique identifier for this application
    pub id: Uuid,

    /// Applicant
    pub user_id: Uuid,

    /// Scheme applied for
    pub scheme_id: Uuid,

    /// Review state
    pub status: ApplicationStatus,

    /// Scheme price snapshot in paise
    pub amount_paise: i64,

    /// Commission base in paise (the scheme price snapshot)
    pub base_amount_paise: i64,

    /// Price plus service charge in paise; the amount the wallet pays
    pub total_amount_paise: i64,

    /// Payment state
    pub payment_status: PaymentState,

    /// Commission percentage snapshot
    ///
    /// Written at submission from the scheme, overwritten at approval with
    /// the rate actually used for the payout.
    pub commission_rate: Decimal,

    /// Commission actually credited, in paise (set at approval)
    pub commission_amount_paise: Option<i64>,

    /// Whether the commission payout has happened (false → true at most once)
    pub commission_paid: bool,

    /// When the commission was credited
    pub commission_paid_at: Option<DateTime<Utc>>,

    /// Admin notes recorded with the decision
    pub review_notes: Option<String>,

    /// Timestamp when the application was submitted
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last state change
    pub updated_at: DateTime<Utc>,
}

/// Request body for submitting an application.
///
/// # JSON Example
///
/// ```json
/// {
///   "scheme_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    /// Scheme to apply for (must be active)
    pub scheme_id: Uuid,
}

/// Query parameters for listing applications.
#[derive(Debug, Default, Deserialize)]
pub struct ListApplicationsQuery {
    /// Restrict to one review state
    pub status: Option<ApplicationStatus>,
}

/// Request body for the admin decision endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "status": "REJECTED",
///   "notes": "Aadhaar number illegible",
///   "refund": true
/// }
/// ```
///
/// # Validation
///
/// - `status`: must be `APPROVED` or `REJECTED`
/// - `refund`: only meaningful with `REJECTED`; refunds the collected
///   payment if there is one
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// The decision
    pub status: ApplicationStatus,

    /// Optional review notes stored on the application
    pub notes: Option<String>,

    /// Whether a rejection should refund an already-collected payment
    #[serde(default)]
    pub refund: bool,
}

/// Response body for the admin decision endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "application": { "id": "...", "status": "REJECTED", ... },
///   "wallet": { "id": "...", "balance_paise": 65000, ... },
///   "refund_transaction": { "id": "...", "amount_paise": 15000, ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub success: bool,

    /// The application after the decision
    pub application: Application,

    /// Applicant's wallet after any money movement (absent when none happened)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Wallet>,

    /// The refund ledger entry, when a refund was processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_transaction: Option<Transaction>,
}

/// Response body for the owner pay endpoint.
///
/// Mirrors [`DecisionResponse`]: paying an already-paid application is a
/// success with both optional fields absent.
#[derive(Debug, Serialize)]
pub struct PayApplicationResponse {
    pub success: bool,

    /// The application after the payment attempt
    pub application: Application,

    /// Applicant's wallet after the debit (absent when nothing was collected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Wallet>,

    /// The SCHEME_PAYMENT ledger entry, when money moved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_transaction: Option<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_applications_can_be_decided_once() {
        assert!(ApplicationStatus::Pending.can_transition_to(ApplicationStatus::Approved));
        assert!(ApplicationStatus::Pending.can_transition_to(ApplicationStatus::Rejected));
        assert!(!ApplicationStatus::Approved.can_transition_to(ApplicationStatus::Rejected));
        assert!(!ApplicationStatus::Rejected.can_transition_to(ApplicationStatus::Approved));
        assert!(!ApplicationStatus::Rejected.can_transition_to(ApplicationStatus::Pending));
    }

    #[test]
    fn approved_applications_can_complete() {
        assert!(ApplicationStatus::Approved.can_transition_to(ApplicationStatus::Completed));
        assert!(!ApplicationStatus::Pending.can_transition_to(ApplicationStatus::Completed));
        assert!(!ApplicationStatus::Completed.can_transition_to(ApplicationStatus::Approved));
    }

    #[test]
    fn payment_moves_forward_only() {
        assert!(PaymentState::Pending.can_transition_to(PaymentState::Paid));
        assert!(PaymentState::Paid.can_transition_to(PaymentState::Refunded));
        assert!(!PaymentState::Pending.can_transition_to(PaymentState::Refunded));
        assert!(!PaymentState::Refunded.can_transition_to(PaymentState::Paid));
        assert!(!PaymentState::Paid.can_transition_to(PaymentState::Pending));
    }

    #[test]
    fn status_literals_match_the_wire_format() {
        let approved = serde_json::to_string(&ApplicationStatus::Approved).unwrap();
        assert_eq!(approved, "\"APPROVED\"");
        let parsed: PaymentState = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(parsed, PaymentState::Refunded);
    }

    #[test]
    fn display_matches_the_wire_literal() {
        assert_eq!(ApplicationStatus::Pending.to_string(), "PENDING");
        assert_eq!(ApplicationStatus::Completed.to_string(), "COMPLETED");
    }
}

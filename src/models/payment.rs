//! Gateway payment orders and webhook payloads.
//!
//! This module defines:
//! - `PaymentOrderStatus` / `PaymentOrder`: merchant orders handed to the
//!   payment gateway for wallet recharges
//! - The webhook envelope types the gateway POSTs back
//! - Request/response types for order creation and webhook acknowledgement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a gateway order.
///
/// Webhooks drive both transitions. PAID is terminal and is the claim that
/// guards wallet crediting: a duplicate success webhook finds the order
/// already PAID and does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_order_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOrderStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentOrderStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PaymentOrderStatus) -> bool {
        use PaymentOrderStatus::*;
        matches!((self, next), (Pending, Paid) | (Pending, Failed))
    }
}

/// Represents a gateway order record from the database.
///
/// # Database Table
///
/// Maps to the `payment_orders` table. The customer pays
/// `total_amount_paise` at the gateway, but only `base_amount_paise` is
/// credited to the wallet; the surcharge covers the gateway fee plus GST
/// and never becomes wallet money.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentOrder {
    /// Unique identifier for this order row
    pub id: Uuid,

    /// Merchant order id sent to the gateway and echoed back in webhooks
    pub order_id: String,

    /// User whose wallet the recharge targets
    pub user_id: Uuid,

    /// Amount credited to the wallet on success, in paise
    pub base_amount_paise: i64,

    /// Gateway fee plus GST, in paise (collected, never credited)
    pub surcharge_paise: i64,

    /// What the customer actually pays at the gateway, in paise
    pub total_amount_paise: i64,

    /// Order status
    pub status: PaymentOrderStatus,

    /// Payment method reported by the gateway (upi, card, netbanking, ...)
    pub payment_method: Option<String>,

    /// The gateway's own order identifier
    pub cf_order_id: Option<String>,

    /// When the success webhook was processed
    pub paid_at: Option<DateTime<Utc>>,

    /// Timestamp when the order was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last status change
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a recharge order.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount_paise": 50000
/// }
/// ```
///
/// # Validation
///
/// - `amount_paise`: the wallet credit wanted; must be positive. The
///   surcharge is computed server-side and added on top.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentOrderRequest {
    /// Wallet credit amount in paise
    pub amount_paise: i64,
}

/// Event types the gateway delivers.
///
/// Anything unrecognized parses as `Unknown` and is acknowledged without
/// action, so the gateway adding event types never causes retry storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "PAYMENT_SUCCESS_WEBHOOK")]
    PaymentSuccess,
    #[serde(rename = "PAYMENT_FAILED_WEBHOOK")]
    PaymentFailed,
    #[serde(other)]
    Unknown,
}

/// Outer webhook payload.
///
/// `data` stays unparsed until the event type is known: unknown events may
/// carry shapes this service has never seen, and they must still be
/// acknowledged cleanly.
///
/// # JSON Example
///
/// ```json
/// {
///   "type": "PAYMENT_SUCCESS_WEBHOOK",
///   "data": {
///     "order": {
///       "order_id": "order_8f2a61",
///       "payment_method": "upi",
///       "cf_order_id": "2149120519"
///     }
///   }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Event type discriminator
    #[serde(rename = "type")]
    pub event_type: WebhookEventType,

    /// Event payload, parsed further only for known event types
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of the payment success/failure events.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub order: WebhookOrder,
}

/// Order details inside a payment webhook.
///
/// The gateway sends more fields than these; serde drops the rest.
#[derive(Debug, Deserialize)]
pub struct WebhookOrder {
    /// Our merchant order id
    pub order_id: String,

    /// How the customer paid
    pub payment_method: Option<String>,

    /// The gateway's order identifier
    pub cf_order_id: Option<String>,
}

/// Response body acknowledging a webhook delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

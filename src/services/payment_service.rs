//! Payment service - gateway recharge orders and the webhooks that settle them.
//!
//! This module handles merchant order creation, HMAC verification of
//! incoming gateway webhooks, and the wallet crediting a successful payment
//! triggers.
//!
//! # Idempotency
//!
//! Gateways redeliver webhooks. Crediting is guarded by the order status:
//! PENDING → PAID is claimed with a conditional UPDATE inside the same
//! database transaction as the wallet credit, so a redelivered success
//! webhook finds the order already PAID and is acknowledged without moving
//! money a second time.

use crate::{
    db::DbPool,
    error::AppError,
    models::money::{Paise, format_paise},
    models::payment::{
        PaymentOrder, PaymentOrderStatus, WebhookData, WebhookEnvelope, WebhookEventType,
        WebhookOrder,
    },
    models::transaction::TransactionType,
    services::wallet_service,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Largest single recharge accepted, in paise (₹1,00,000).
const MAX_RECHARGE_PAISE: Paise = 10_000_000;

/// What processing a webhook delivery amounted to.
///
/// All four outcomes are acknowledged with HTTP 200; the gateway must not
/// retry any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A pending order was settled and the wallet credited
    Credited,
    /// A pending order was marked failed; no wallet was touched
    MarkedFailed,
    /// The order was already settled; nothing happened
    Duplicate,
    /// An event type this service does not handle
    Ignored,
}

impl WebhookOutcome {
    /// Acknowledgement message for the webhook response body.
    pub fn message(&self) -> &'static str {
        match self {
            WebhookOutcome::Credited => "Payment processed",
            WebhookOutcome::MarkedFailed => "Payment failure recorded",
            WebhookOutcome::Duplicate => "Webhook already processed",
            WebhookOutcome::Ignored => "Event ignored",
        }
    }
}

/// Gateway surcharge for a recharge, rounded up to the next paisa.
///
/// `fee_bps` is in basis points: the default 236 covers a 2% gateway fee
/// plus 18% GST on that fee. Rounding is always up so the surcharge never
/// undercharges by a fraction of a paisa.
pub fn surcharge_paise(base_amount_paise: Paise, fee_bps: i64) -> Paise {
    if base_amount_paise <= 0 || fee_bps <= 0 {
        return 0;
    }
    let numerator = base_amount_paise as u128 * fee_bps as u128;
    numerator.div_ceil(10_000) as Paise
}

/// Merchant order id handed to the gateway and echoed back in webhooks.
fn generate_order_id() -> String {
    let bytes: [u8; 12] = rand::random();
    format!("order_{}", hex::encode(bytes))
}

/// Create a recharge order for the gateway handoff.
///
/// # Process
///
/// 1. Validate the requested amount
/// 2. Compute the surcharge from the configured fee
/// 3. Generate a merchant order id
/// 4. Insert the PENDING order
///
/// The caller forwards the order to the client, which completes the payment
/// at the gateway; settlement arrives later through the webhook.
///
/// # Errors
///
/// - `InvalidRequest`: amount is not positive or exceeds the recharge limit
/// - `Database`: insert failed
pub async fn create_payment_order(
    pool: &DbPool,
    user_id: Uuid,
    base_amount_paise: Paise,
    gateway_fee_bps: i64,
) -> Result<PaymentOrder, AppError> {
    if base_amount_paise <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    if base_amount_paise > MAX_RECHARGE_PAISE {
        return Err(AppError::InvalidRequest(format!(
            "Amount exceeds the {} recharge limit",
            format_paise(MAX_RECHARGE_PAISE)
        )));
    }

    let surcharge = surcharge_paise(base_amount_paise, gateway_fee_bps);

    let order = sqlx::query_as::<_, PaymentOrder>(
        r#"
        INSERT INTO payment_orders
            (order_id, user_id, base_amount_paise, surcharge_paise, total_amount_paise)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(generate_order_id())
    .bind(user_id)
    .bind(base_amount_paise)
    .bind(surcharge)
    .bind(base_amount_paise + surcharge)
    .fetch_one(pool)
    .await?;

    Ok(order)
}

/// Compute the webhook signature for a timestamp and raw body.
///
/// `base64(HMAC-SHA256(secret, timestamp + body))`, matching what the
/// gateway sends in `x-webhook-signature`. The service only ever verifies;
/// signing exists for tests and local tooling that replay webhooks.
pub fn sign_webhook(secret: &str, timestamp: &str, raw_body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(timestamp.as_bytes());
    mac.update(raw_body.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a webhook's signature before anything else looks at the payload.
///
/// # Process
///
/// 1. Base64-decode the signature from `x-webhook-signature`
/// 2. Compute HMAC-SHA256 over the `x-webhook-timestamp` value concatenated
///    with the raw body
/// 3. Compare in constant time
///
/// # Errors
///
/// `InvalidSignature` for undecodable or mismatching signatures. The error
/// carries no detail about which step failed.
pub fn verify_webhook_signature(
    secret: &str,
    timestamp: &str,
    raw_body: &str,
    signature: &str,
) -> Result<(), AppError> {
    let provided = BASE64
        .decode(signature)
        .map_err(|_| AppError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(timestamp.as_bytes());
    mac.update(raw_body.as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| AppError::InvalidSignature)
}

/// Process a verified webhook delivery.
///
/// Success events settle the order and credit the wallet; failure events
/// mark the order failed; anything else is acknowledged and ignored.
///
/// # Errors
///
/// - `InvalidRequest`: a known event type carried a malformed payload
/// - `PaymentOrderNotFound`: the delivery references an order id this
///   service never issued
/// - `Database`: query failed
pub async fn process_payment_webhook(
    pool: &DbPool,
    envelope: WebhookEnvelope,
) -> Result<WebhookOutcome, AppError> {
    match envelope.event_type {
        WebhookEventType::PaymentSuccess => {
            let data = parse_order(envelope.data)?;
            handle_payment_success(pool, data.order).await
        }
        WebhookEventType::PaymentFailed => {
            let data = parse_order(envelope.data)?;
            handle_payment_failed(pool, data.order).await
        }
        WebhookEventType::Unknown => {
            tracing::debug!("ignoring unhandled webhook event type");
            Ok(WebhookOutcome::Ignored)
        }
    }
}

/// Parse the order payload of a known event type.
fn parse_order(data: serde_json::Value) -> Result<WebhookData, AppError> {
    serde_json::from_value(data)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook payload: {e}")))
}

/// Settle a successful payment: claim the order, credit the wallet.
async fn handle_payment_success(
    pool: &DbPool,
    order: WebhookOrder,
) -> Result<WebhookOutcome, AppError> {
    let existing =
        sqlx::query_as::<_, PaymentOrder>("SELECT * FROM payment_orders WHERE order_id = $1")
            .bind(&order.order_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::PaymentOrderNotFound)?;

    if existing.status == PaymentOrderStatus::Paid {
        // Redelivery of an order we already settled
        return Ok(WebhookOutcome::Duplicate);
    }

    let mut tx = pool.begin().await?;

    // Claim PENDING -> PAID; a racing duplicate sees zero rows
    let claimed = sqlx::query_as::<_, PaymentOrder>(
        r#"
        UPDATE payment_orders
        SET status = $1,
            payment_method = $2,
            cf_order_id = $3,
            paid_at = NOW(),
            updated_at = NOW()
        WHERE order_id = $4 AND status = $5
        RETURNING *
        "#,
    )
    .bind(PaymentOrderStatus::Paid)
    .bind(&order.payment_method)
    .bind(&order.cf_order_id)
    .bind(&order.order_id)
    .bind(PaymentOrderStatus::Pending)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(claimed) = claimed else {
        tx.rollback().await?;
        return Ok(WebhookOutcome::Duplicate);
    };

    // Only the base amount becomes wallet money; the surcharge stays with
    // the gateway and the taxman
    let wallet = wallet_service::get_or_create_wallet(&mut *tx, claimed.user_id).await?;

    let metadata = serde_json::json!({
        "order_id": claimed.order_id,
        "cf_order_id": claimed.cf_order_id,
        "payment_method": claimed.payment_method,
        "surcharge_paise": claimed.surcharge_paise,
    });

    wallet_service::credit(
        &mut *tx,
        wallet.id,
        claimed.user_id,
        claimed.base_amount_paise,
        TransactionType::Deposit,
        Some("Wallet recharge".to_string()),
        Some(claimed.order_id.clone()),
        Some(metadata),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %claimed.order_id,
        amount_paise = claimed.base_amount_paise,
        "recharge credited"
    );

    Ok(WebhookOutcome::Credited)
}

/// Record a failed payment. Never touches wallets.
async fn handle_payment_failed(
    pool: &DbPool,
    order: WebhookOrder,
) -> Result<WebhookOutcome, AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE payment_orders
        SET status = $1,
            payment_method = $2,
            cf_order_id = $3,
            updated_at = NOW()
        WHERE order_id = $4 AND status = $5
        "#,
    )
    .bind(PaymentOrderStatus::Failed)
    .bind(&order.payment_method)
    .bind(&order.cf_order_id)
    .bind(&order.order_id)
    .bind(PaymentOrderStatus::Pending)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        // Unknown order ids are an error; settled orders are left alone
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payment_orders WHERE order_id = $1)",
        )
        .bind(&order.order_id)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Err(AppError::PaymentOrderNotFound);
        }
        return Ok(WebhookOutcome::Duplicate);
    }

    tracing::info!(order_id = %order.order_id, "payment failure recorded");

    Ok(WebhookOutcome::MarkedFailed)
}

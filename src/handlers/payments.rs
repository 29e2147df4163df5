//! Gateway payment HTTP handlers.
//!
//! This module implements the recharge endpoints:
//! - POST /wallet/payments - Create a gateway order for a wallet recharge
//! - POST /wallet/payments/webhook - Gateway settlement callback (public)
//!
//! The webhook route is the only unauthenticated write in the service, so
//! it gets its own gate: when a webhook secret is configured, the HMAC
//! signature is verified against the raw body before anything is parsed.

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::payment::{CreatePaymentOrderRequest, PaymentOrder, WebhookAck, WebhookEnvelope},
    services::payment_service,
};
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

/// Create a recharge order for the client's gateway handoff.
///
/// # Endpoint
///
/// `POST /wallet/payments`
///
/// # Request Body
///
/// ```json
/// {
///   "amount_paise": 50000
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The PENDING order, including the merchant
///   `order_id` the client takes to the gateway and the surcharged total
/// - **Error (400)**: Non-positive amount or above the recharge limit
///
/// The wallet is credited only when the gateway's success webhook lands.
pub async fn create_payment_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreatePaymentOrderRequest>,
) -> Result<(StatusCode, Json<PaymentOrder>), AppError> {
    let order = payment_service::create_payment_order(
        &state.pool,
        auth.user_id,
        request.amount_paise,
        state.config.gateway_fee_bps,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Receive a gateway webhook.
///
/// # Endpoint
///
/// `POST /wallet/payments/webhook` (public)
///
/// # Process
///
/// 1. When a secret is configured, verify
///    `x-webhook-signature` = base64(HMAC-SHA256(secret, timestamp + body))
///    with the timestamp from `x-webhook-timestamp`; failure is 401 before
///    the body is parsed or the database touched
/// 2. Parse the envelope
/// 3. Hand known event types to the payment service; acknowledge the rest
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "message": "Payment processed"
/// }
/// ```
///
/// Redeliveries of settled orders are also 200 success, so a healthy
/// gateway stops retrying.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature = headers
            .get("x-webhook-signature")
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::InvalidSignature)?;
        let timestamp = headers
            .get("x-webhook-timestamp")
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::InvalidSignature)?;

        payment_service::verify_webhook_signature(secret, timestamp, &body, signature)?;
    }

    let envelope: WebhookEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook body: {e}")))?;

    let outcome = payment_service::process_payment_webhook(&state.pool, envelope).await?;

    Ok(Json(WebhookAck {
        success: true,
        message: outcome.message().to_string(),
    }))
}

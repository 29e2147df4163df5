//! Recharge tests: gateway order creation and webhook settlement.
//!
//! These run against a real Postgres named by `DATABASE_URL` and skip
//! silently when none is configured.

mod common;

use anyhow::Result;
use sevapay::db::DbPool;
use sevapay::error::AppError;
use sevapay::models::payment::{PaymentOrder, PaymentOrderStatus, WebhookEnvelope, WebhookEventType};
use sevapay::models::transaction::TransactionType;
use sevapay::models::user::UserRole;
use sevapay::services::payment_service::{self, WebhookOutcome};
use sevapay::services::wallet_service;
use serde_json::json;

/// Webhook delivery for an order, the shape the gateway posts.
fn delivery(event_type: WebhookEventType, order_id: &str) -> WebhookEnvelope {
    WebhookEnvelope {
        event_type,
        data: json!({
            "order": {
                "order_id": order_id,
                "payment_method": "upi",
                "cf_order_id": "cf_9000123",
            }
        }),
    }
}

async fn reload_order(pool: &DbPool, order_id: &str) -> Result<PaymentOrder> {
    let order =
        sqlx::query_as::<_, PaymentOrder>("SELECT * FROM payment_orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(pool)
            .await?;
    Ok(order)
}

#[tokio::test]
async fn order_carries_the_surcharge_on_top_of_the_base() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let user = common::create_user(&pool, "Recharging Retailer", UserRole::Retailer).await?;

    // ₹500.00 at 2.36%
    let order = payment_service::create_payment_order(&pool, user.id, 50_000, 236).await?;
    assert_eq!(order.base_amount_paise, 50_000);
    assert_eq!(order.surcharge_paise, 1_180);
    assert_eq!(order.total_amount_paise, 51_180);
    assert_eq!(order.status, PaymentOrderStatus::Pending);
    assert!(order.order_id.starts_with("order_"));

    Ok(())
}

#[tokio::test]
async fn duplicate_success_webhooks_credit_once() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let user = common::create_user(&pool, "Webhook Retailer", UserRole::Retailer).await?;
    let order = payment_service::create_payment_order(&pool, user.id, 50_000, 236).await?;

    let outcome = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentSuccess, &order.order_id),
    )
    .await?;
    assert_eq!(outcome, WebhookOutcome::Credited);

    // Only the base lands in the wallet; the surcharge never does
    let mut conn = pool.acquire().await?;
    let wallet = wallet_service::find_wallet_for_user(&mut conn, user.id)
        .await?
        .unwrap();
    assert_eq!(wallet.balance_paise, 50_000);

    let order_row = reload_order(&pool, &order.order_id).await?;
    assert_eq!(order_row.status, PaymentOrderStatus::Paid);
    assert_eq!(order_row.payment_method.as_deref(), Some("upi"));
    assert_eq!(order_row.cf_order_id.as_deref(), Some("cf_9000123"));
    assert!(order_row.paid_at.is_some());

    // The gateway redelivers; the wallet must not move again
    let outcome = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentSuccess, &order.order_id),
    )
    .await?;
    assert_eq!(outcome, WebhookOutcome::Duplicate);

    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 50_000);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 1);

    let deposits = wallet_service::list_transactions(&mut conn, wallet.id, 10).await?;
    assert_eq!(deposits[0].transaction_type, TransactionType::Deposit);
    assert_eq!(deposits[0].amount_paise, 50_000);
    assert_eq!(deposits[0].reference.as_deref(), Some(order.order_id.as_str()));

    Ok(())
}

#[tokio::test]
async fn failed_payment_never_credits() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let user = common::create_user(&pool, "Failed Payment User", UserRole::Customer).await?;
    let order = payment_service::create_payment_order(&pool, user.id, 25_000, 236).await?;

    let outcome = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentFailed, &order.order_id),
    )
    .await?;
    assert_eq!(outcome, WebhookOutcome::MarkedFailed);

    let order_row = reload_order(&pool, &order.order_id).await?;
    assert_eq!(order_row.status, PaymentOrderStatus::Failed);

    // No wallet was ever created for this user
    let mut conn = pool.acquire().await?;
    assert!(
        wallet_service::find_wallet_for_user(&mut conn, user.id)
            .await?
            .is_none()
    );

    // A success delivery for the already-failed order settles nothing
    let outcome = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentSuccess, &order.order_id),
    )
    .await?;
    assert_eq!(outcome, WebhookOutcome::Duplicate);
    assert!(
        wallet_service::find_wallet_for_user(&mut conn, user.id)
            .await?
            .is_none()
    );

    Ok(())
}

#[tokio::test]
async fn webhook_for_an_unknown_order_is_an_error() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let result = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentSuccess, "order_never_issued"),
    )
    .await;
    assert!(matches!(result, Err(AppError::PaymentOrderNotFound)));

    let result = payment_service::process_payment_webhook(
        &pool,
        delivery(WebhookEventType::PaymentFailed, "order_never_issued"),
    )
    .await;
    assert!(matches!(result, Err(AppError::PaymentOrderNotFound)));

    Ok(())
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged_and_ignored() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let envelope: WebhookEnvelope = serde_json::from_str(
        r#"{"type":"REFUND_STATUS_WEBHOOK","data":{"refund":{"refund_id":"rf_1"}}}"#,
    )?;
    let outcome = payment_service::process_payment_webhook(&pool, envelope).await?;
    assert_eq!(outcome, WebhookOutcome::Ignored);

    Ok(())
}

#[tokio::test]
async fn recharge_amount_is_bounded() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let user = common::create_user(&pool, "Greedy Recharger", UserRole::Retailer).await?;

    let result = payment_service::create_payment_order(&pool, user.id, 0, 236).await;
    assert!(matches!(result, Err(AppError::InvalidRequest(_))));

    // One paisa over the ₹1,00,000 cap
    let result = payment_service::create_payment_order(&pool, user.id, 10_000_001, 236).await;
    assert!(matches!(result, Err(AppError::InvalidRequest(_))));

    Ok(())
}

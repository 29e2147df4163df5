//! Application money-flow tests: payment collection, retailer commission,
//! and rejection refunds.
//!
//! These run against a real Postgres named by `DATABASE_URL` and skip
//! silently when none is configured.

mod common;

use anyhow::Result;
use axum::Json;
use axum::extract::{Path, State};
use sevapay::AppState;
use sevapay::config::Config;
use sevapay::db::DbPool;
use sevapay::handlers::applications;
use sevapay::models::application::{ApplicationStatus, DecisionRequest, PaymentState};
use sevapay::models::transaction::TransactionType;
use sevapay::models::user::UserRole;
use sevapay::services::approval_service;
use sevapay::services::wallet_service;

/// ₹100.00 price + ₹30.00 service charge, 10% commission on the price.
const PRICE: i64 = 10_000;
const CHARGE: i64 = 3_000;
const TOTAL: i64 = PRICE + CHARGE;
const COMMISSION: i64 = 1_000;

/// State for calling the decision handler directly; the config values are
/// never read by it.
fn test_state(pool: &DbPool) -> AppState {
    AppState {
        pool: pool.clone(),
        config: Config {
            database_url: String::new(),
            server_port: 0,
            webhook_secret: None,
            gateway_fee_bps: 236,
            bootstrap_admin_key: None,
        },
    }
}

#[tokio::test]
async fn approval_collects_payment_and_pays_commission_once() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Approval Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Birth Certificate", PRICE, CHARGE, "10.00".parse()?).await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 50_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    let outcome = approval_service::process_approval_side_effects(&pool, &application).await?;

    // Total debited, commission on the base credited back
    let payment = outcome.payment_transaction.as_ref().unwrap();
    assert_eq!(payment.amount_paise, -TOTAL);
    assert_eq!(payment.transaction_type, TransactionType::SchemePayment);
    assert_eq!(payment.reference.as_deref(), Some(application.id.to_string().as_str()));

    let commission = outcome.commission_transaction.as_ref().unwrap();
    assert_eq!(commission.amount_paise, COMMISSION);
    assert_eq!(commission.transaction_type, TransactionType::Commission);

    assert_eq!(
        outcome.wallet.as_ref().unwrap().balance_paise,
        50_000 - TOTAL + COMMISSION
    );

    // The flags that make a re-run a no-op are down
    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Paid);
    assert!(application.commission_paid);
    assert!(application.commission_paid_at.is_some());
    assert_eq!(application.commission_amount_paise, Some(COMMISSION));

    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 3);

    Ok(())
}

#[tokio::test]
async fn reapproving_moves_no_money() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Reapproval Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Income Certificate", PRICE, CHARGE, "10.00".parse()?).await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 50_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    approval_service::process_approval_side_effects(&pool, &application).await?;

    // Re-run with the same stale row the first call saw: both claims are
    // already taken, so the conditional updates have to catch it
    let again = approval_service::process_approval_side_effects(&pool, &application).await?;
    assert!(again.wallet.is_none());
    assert!(again.payment_transaction.is_none());
    assert!(again.commission_transaction.is_none());

    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 50_000 - TOTAL + COMMISSION);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 3);

    Ok(())
}

#[tokio::test]
async fn customers_earn_no_commission() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let customer = common::create_user(&pool, "Walk-in Customer", UserRole::Customer).await?;
    let scheme =
        common::create_scheme(&pool, "Caste Certificate", PRICE, CHARGE, "10.00".parse()?).await?;
    let wallet = common::fund_wallet(&pool, customer.id, 50_000).await?;
    let application = common::submit_application(&pool, &customer, &scheme).await?;

    let outcome = approval_service::process_approval_side_effects(&pool, &application).await?;

    assert!(outcome.payment_transaction.is_some());
    assert!(outcome.commission_transaction.is_none());
    assert_eq!(outcome.wallet.as_ref().unwrap().balance_paise, 50_000 - TOTAL);

    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Paid);
    assert!(!application.commission_paid);
    assert_eq!(application.commission_amount_paise, None);

    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 2);

    Ok(())
}

#[tokio::test]
async fn prepaid_application_only_needs_the_commission() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Prepaying Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Domicile Certificate", PRICE, CHARGE, "10.00".parse()?)
            .await?;
    common::fund_wallet(&pool, retailer.id, 50_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    // Paid up front through the pay endpoint's path
    let collected = approval_service::collect_payment(&pool, &application).await?;
    assert!(collected.is_some());

    // Approval then finds the payment done and only pays the commission
    let application = common::reload_application(&pool, application.id).await?;
    let outcome = approval_service::process_approval_side_effects(&pool, &application).await?;
    assert!(outcome.payment_transaction.is_none());
    let commission = outcome.commission_transaction.as_ref().unwrap();
    assert_eq!(commission.amount_paise, COMMISSION);
    assert_eq!(
        outcome.wallet.as_ref().unwrap().balance_paise,
        50_000 - TOTAL + COMMISSION
    );

    Ok(())
}

#[tokio::test]
async fn insufficient_balance_aborts_the_approval_cleanly() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Underfunded Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Land Record Copy", PRICE, CHARGE, "10.00".parse()?).await?;
    // One paisa short of the total
    let wallet = common::fund_wallet(&pool, retailer.id, TOTAL - 1).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    let result = approval_service::process_approval_side_effects(&pool, &application).await;
    assert!(result.is_err());

    // The claim rolled back with the failed debit, so a top-up and a retry
    // start from scratch
    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Pending);
    assert!(!application.commission_paid);

    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, TOTAL - 1);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn rejection_refund_round_trips_the_balance() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Refunded Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Ration Card Update", PRICE, CHARGE, "10.00".parse()?)
            .await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 20_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    let (_, payment) = approval_service::collect_payment(&pool, &application)
        .await?
        .unwrap();

    let application = common::reload_application(&pool, application.id).await?;
    let (refund_wallet, refund) =
        approval_service::process_rejection_refund(&pool, &application, true)
            .await?
            .unwrap();

    // Money came all the way back
    assert_eq!(refund_wallet.balance_paise, 20_000);
    assert_eq!(refund.amount_paise, TOTAL);
    assert_eq!(refund.transaction_type, TransactionType::Refund);

    // Both ledger entries point at the same application
    assert_eq!(payment.reference, refund.reference);
    assert_eq!(refund.reference.as_deref(), Some(application.id.to_string().as_str()));

    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Refunded);

    // Deposit, payment, refund
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 3);

    // A second refund attempt finds nothing to give back
    let again = approval_service::process_rejection_refund(&pool, &application, true).await?;
    assert!(again.is_none());
    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 20_000);

    Ok(())
}

#[tokio::test]
async fn rejecting_an_unpaid_application_refunds_nothing() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Unpaid Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Pension Enrollment", PRICE, CHARGE, "10.00".parse()?)
            .await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 5_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    let refunded = approval_service::process_rejection_refund(&pool, &application, true).await?;
    assert!(refunded.is_none());

    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Pending);

    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 5_000);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn rejection_without_a_refund_keeps_the_payment() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Forfeiting Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Trade License", PRICE, CHARGE, "10.00".parse()?).await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 20_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    approval_service::collect_payment(&pool, &application).await?;

    let application = common::reload_application(&pool, application.id).await?;
    let refunded = approval_service::process_rejection_refund(&pool, &application, false).await?;
    assert!(refunded.is_none());

    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Paid);

    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 20_000 - TOTAL);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 2);

    Ok(())
}

#[tokio::test]
async fn a_repeat_rejection_with_refund_recovers_a_raced_payment() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let retailer = common::create_user(&pool, "Raced Retailer", UserRole::Retailer).await?;
    let scheme =
        common::create_scheme(&pool, "Voter ID Correction", PRICE, CHARGE, "10.00".parse()?)
            .await?;
    let wallet = common::fund_wallet(&pool, retailer.id, 50_000).await?;
    let application = common::submit_application(&pool, &retailer, &scheme).await?;

    // A rejection reads the application first and finds nothing collected
    let refunded = approval_service::process_rejection_refund(&pool, &application, true).await?;
    assert!(refunded.is_none());

    // ... then wins the status claim
    let claimed = sqlx::query(
        "UPDATE applications SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
    )
    .bind(ApplicationStatus::Rejected)
    .bind(application.id)
    .bind(ApplicationStatus::Pending)
    .execute(&pool)
    .await?
    .rows_affected();
    assert_eq!(claimed, 1);

    // A concurrent approval, still holding the PENDING row it read, commits
    // its side effects anyway before its own status claim loses
    let outcome = approval_service::process_approval_side_effects(&pool, &application).await?;
    assert!(outcome.payment_transaction.is_some());
    assert!(outcome.commission_transaction.is_some());

    let stuck = common::reload_application(&pool, application.id).await?;
    assert_eq!(stuck.status, ApplicationStatus::Rejected);
    assert_eq!(stuck.payment_status, PaymentState::Paid);

    // Rejecting again with refund on returns the collected payment
    let Json(response) = applications::decide_application(
        State(test_state(&pool)),
        Path(application.id),
        Json(DecisionRequest {
            status: ApplicationStatus::Rejected,
            notes: None,
            refund: true,
        }),
    )
    .await?;

    assert!(response.success);
    assert_eq!(response.application.payment_status, PaymentState::Refunded);
    let refund = response.refund_transaction.unwrap();
    assert_eq!(refund.amount_paise, TOTAL);
    assert_eq!(refund.transaction_type, TransactionType::Refund);

    // The payment came back; the commission payout stands
    let wallet = common::reload_wallet(&pool, wallet.id).await?;
    assert_eq!(wallet.balance_paise, 50_000 + COMMISSION);
    assert_eq!(common::count_transactions(&pool, wallet.id).await?, 4);

    // A further repeat finds nothing left to refund
    let Json(response) = applications::decide_application(
        State(test_state(&pool)),
        Path(application.id),
        Json(DecisionRequest {
            status: ApplicationStatus::Rejected,
            notes: None,
            refund: true,
        }),
    )
    .await?;
    assert!(response.success);
    assert!(response.refund_transaction.is_none());

    Ok(())
}

#[tokio::test]
async fn free_applications_never_collect_a_payment() -> Result<()> {
    let Some(pool) = common::test_pool().await? else {
        return Ok(());
    };

    let customer = common::create_user(&pool, "Free Scheme Customer", UserRole::Customer).await?;
    let scheme =
        common::create_scheme(&pool, "Aadhaar Address Check", 0, 0, "0".parse()?).await?;
    let application = common::submit_application(&pool, &customer, &scheme).await?;

    // No wallet exists and none is needed
    let collected = approval_service::collect_payment(&pool, &application).await?;
    assert!(collected.is_none());

    // There is nothing to collect, so payment never leaves PENDING
    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Pending);

    // A full approval moves no money either
    let outcome = approval_service::process_approval_side_effects(&pool, &application).await?;
    assert!(outcome.wallet.is_none());
    assert!(outcome.payment_transaction.is_none());
    assert!(outcome.commission_transaction.is_none());

    let application = common::reload_application(&pool, application.id).await?;
    assert_eq!(application.payment_status, PaymentState::Pending);

    let mut conn = pool.acquire().await?;
    let wallet = wallet_service::find_wallet_for_user(&mut conn, customer.id).await?;
    assert!(wallet.is_none());

    Ok(())
}

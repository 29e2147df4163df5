//! Approval service - money side effects of application review.
//!
//! This service handles:
//! - Collecting an application's payment from the applicant's wallet
//! - Paying retailer commission on approval
//! - Refunding collected payments on rejection
//!
//! # Idempotency
//!
//! Every flow claims a persisted guard first inside its own database
//! transaction: payment collection claims `payment_status` PENDING → PAID,
//! commission claims `commission_paid` false → true, refunds claim PAID →
//! REFUNDED. The claim is a conditional UPDATE, so under concurrent or
//! repeated invocations exactly one caller proceeds to move money; everyone
//! else sees zero rows affected and does nothing. If the money movement
//! fails, the transaction rolls back and the claim is released.
//!
//! Payment and commission are deliberately independent claims, not one
//! atomic unit: a crash between them leaves the collected payment in place,
//! and the next approval attempt picks up only the missing commission.

use crate::{
    db::DbPool,
    error::AppError,
    models::application::{Application, PaymentState},
    models::money::Paise,
    models::transaction::{Transaction, TransactionType},
    models::user::UserRole,
    models::wallet::Wallet,
    services::wallet_service,
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// What an approval actually did, for the decision response.
///
/// All three fields are `None` when the call was a pure no-op (everything
/// had been processed earlier).
#[derive(Debug)]
pub struct ApprovalOutcome {
    /// Applicant's wallet after the movements in this call
    pub wallet: Option<Wallet>,

    /// Ledger entry for a payment collected by this call
    pub payment_transaction: Option<Transaction>,

    /// Ledger entry for a commission paid by this call
    pub commission_transaction: Option<Transaction>,
}

/// Row shape for the commission eligibility lookup.
#[derive(sqlx::FromRow)]
struct CommissionContext {
    role: UserRole,
    commission_rate: Decimal,
}

/// Retailer commission for a given base amount and percentage rate.
///
/// Computed entirely in `Decimal` and rounded to the nearest paisa
/// (midpoints away from zero), so 10% of ₹100.00 is exactly ₹10.00 with no
/// float drift. `None` only on overflow past `i64`, which no real scheme
/// price reaches.
pub fn commission_paise(base_amount_paise: Paise, rate: Decimal) -> Option<Paise> {
    let amount = Decimal::from(base_amount_paise) * rate / Decimal::ONE_HUNDRED;
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Collect an application's payment from the applicant's wallet.
///
/// Used by both the explicit pay endpoint and approval step 1.
///
/// # Process
///
/// 1. Fast path out if the application is not payment-PENDING, or has a
///    zero total (a free scheme collects nothing and stays PENDING)
/// 2. Claim PENDING → PAID with a conditional UPDATE
/// 3. Zero rows claimed: someone else collected concurrently; no-op
/// 4. Debit `total_amount_paise` from the applicant's wallet and record a
///    SCHEME_PAYMENT ledger entry referencing the application
/// 5. Commit claim, balance change, and ledger entry together
///
/// # Returns
///
/// The wallet and ledger entry when money moved, `None` when the call was a
/// no-op (already paid, or nothing to collect).
///
/// # Errors
///
/// - `WalletNotFound`: the applicant has no wallet to pay from
/// - `InsufficientBalance`: the wallet cannot cover the total; the claim is
///   rolled back and the application stays payment-PENDING
/// - `Database`: query failed
pub async fn collect_payment(
    pool: &DbPool,
    application: &Application,
) -> Result<Option<(Wallet, Transaction)>, AppError> {
    if application.payment_status != PaymentState::Pending {
        return Ok(None);
    }
    // Free scheme: nothing to collect, payment stays PENDING
    if application.total_amount_paise == 0 {
        return Ok(None);
    }

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE applications
        SET payment_status = $1, updated_at = NOW()
        WHERE id = $2 AND payment_status = $3
        "#,
    )
    .bind(PaymentState::Paid)
    .bind(application.id)
    .bind(PaymentState::Pending)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        // Lost the race; the winner moved the money
        tx.rollback().await?;
        return Ok(None);
    }

    let wallet = wallet_service::find_wallet_for_user(&mut *tx, application.user_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;

    let (wallet, transaction) = wallet_service::debit(
        &mut *tx,
        wallet.id,
        application.user_id,
        application.total_amount_paise,
        TransactionType::SchemePayment,
        Some(format!("Payment for application {}", application.id)),
        Some(application.id.to_string()),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        application_id = %application.id,
        amount_paise = application.total_amount_paise,
        "application payment collected"
    );

    Ok(Some((wallet, transaction)))
}

/// Run the money side effects of approving an application.
///
/// Step 1 collects the payment (no-op if already collected, including
/// applications paid up front through the pay endpoint). Step 2 pays the
/// retailer commission (no-op for non-retailers, zero commission, or an
/// already-paid flag). Each step is idempotent on its own; re-running an
/// approval never double-moves money.
///
/// # Errors
///
/// Any step-1 failure aborts the approval before step 2; the caller leaves
/// the application PENDING. A step-2 failure surfaces after the payment has
/// committed, and a retry picks up at the commission alone.
pub async fn process_approval_side_effects(
    pool: &DbPool,
    application: &Application,
) -> Result<ApprovalOutcome, AppError> {
    // Step 1: payment
    let payment = collect_payment(pool, application).await?;

    // Step 2: commission
    let commission = pay_commission(pool, application).await?;

    // The commission credits the applicant too, so the later of the two
    // wallets is the current one
    let wallet = commission
        .as_ref()
        .map(|(w, _)| w.clone())
        .or_else(|| payment.as_ref().map(|(w, _)| w.clone()));

    Ok(ApprovalOutcome {
        wallet,
        payment_transaction: payment.map(|(_, t)| t),
        commission_transaction: commission.map(|(_, t)| t),
    })
}

/// Pay the retailer commission for an approved application, at most once.
///
/// Reads the applicant's role and the scheme's current commission rate, and
/// persists the rate and rounded amount actually used alongside the
/// `commission_paid` claim. The retailer's wallet is created lazily; a
/// commission may be the first money a retailer ever receives.
async fn pay_commission(
    pool: &DbPool,
    application: &Application,
) -> Result<Option<(Wallet, Transaction)>, AppError> {
    if application.commission_paid {
        return Ok(None);
    }

    let context = sqlx::query_as::<_, CommissionContext>(
        r#"
        SELECT u.role, s.commission_rate
        FROM applications a
        JOIN users u ON u.id = a.user_id
        JOIN schemes s ON s.id = a.scheme_id
        WHERE a.id = $1
        "#,
    )
    .bind(application.id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ApplicationNotFound)?;

    // Only retailers earn commission
    if context.role != UserRole::Retailer {
        return Ok(None);
    }

    let amount = commission_paise(application.base_amount_paise, context.commission_rate)
        .ok_or_else(|| AppError::InvalidRequest("Commission amount out of range".to_string()))?;
    if amount <= 0 {
        return Ok(None);
    }

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE applications
        SET commission_paid = TRUE,
            commission_paid_at = NOW(),
            commission_rate = $1,
            commission_amount_paise = $2,
            updated_at = NOW()
        WHERE id = $3 AND commission_paid = FALSE
        "#,
    )
    .bind(context.commission_rate)
    .bind(amount)
    .bind(application.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let wallet = wallet_service::get_or_create_wallet(&mut *tx, application.user_id).await?;

    let (wallet, transaction) = wallet_service::credit(
        &mut *tx,
        wallet.id,
        application.user_id,
        amount,
        TransactionType::Commission,
        Some(format!("Commission for application {}", application.id)),
        Some(application.id.to_string()),
        None,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        application_id = %application.id,
        amount_paise = amount,
        "retailer commission paid"
    );

    Ok(Some((wallet, transaction)))
}

/// Refund a rejected application's collected payment, at most once.
///
/// # Process
///
/// 1. No-op unless a refund was requested and the application is PAID
/// 2. Claim PAID → REFUNDED with a conditional UPDATE
/// 3. Credit the applicant's wallet with the collected total and record a
///    REFUND ledger entry sharing the application's reference, so the
///    statement pairs it with the original SCHEME_PAYMENT
///
/// # Returns
///
/// The wallet and refund ledger entry, or `None` when nothing was refunded.
///
/// # Errors
///
/// Every failure propagates to the caller; a refund that cannot be
/// processed fails the whole rejection rather than being dropped.
pub async fn process_rejection_refund(
    pool: &DbPool,
    application: &Application,
    refund_requested: bool,
) -> Result<Option<(Wallet, Transaction)>, AppError> {
    if !refund_requested {
        return Ok(None);
    }
    if application.payment_status != PaymentState::Paid {
        // Nothing was collected, nothing to give back
        return Ok(None);
    }

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE applications
        SET payment_status = $1, updated_at = NOW()
        WHERE id = $2 AND payment_status = $3
        "#,
    )
    .bind(PaymentState::Refunded)
    .bind(application.id)
    .bind(PaymentState::Paid)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    // A PAID application always collected a positive total
    let wallet = wallet_service::get_or_create_wallet(&mut *tx, application.user_id).await?;

    let (wallet, transaction) = wallet_service::credit(
        &mut *tx,
        wallet.id,
        application.user_id,
        application.total_amount_paise,
        TransactionType::Refund,
        Some(format!("Refund for application {}", application.id)),
        Some(application.id.to_string()),
        None,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        application_id = %application.id,
        amount_paise = application.total_amount_paise,
        "application payment refunded"
    );

    Ok(Some((wallet, transaction)))
}

//! Wallet service - the ledger primitives every money movement goes through.
//!
//! This service handles:
//! - Lazy wallet creation
//! - Guarded debits and credits
//! - Ledger entry recording
//! - Statement queries
//!
//! # Atomicity Guarantees
//!
//! Every function here runs on a caller-supplied connection. Event flows
//! (payment collection, commission, refunds, deposits) pass their own
//! database transaction, so the balance change and its ledger entry commit
//! together with the caller's state claim or not at all.
//!
//! Balance checks never happen in application code: a debit is one
//! conditional UPDATE whose WHERE clause re-checks the balance, so two
//! concurrent debits cannot both pass a stale check.

use crate::{
    error::AppError,
    models::money::Paise,
    models::transaction::{Transaction, TransactionStatus, TransactionType},
    models::wallet::Wallet,
};
use sqlx::PgConnection;
use uuid::Uuid;

/// Default statement page size when no limit is given.
const DEFAULT_STATEMENT_LIMIT: i64 = 50;

/// Hard cap on statement page size.
const MAX_STATEMENT_LIMIT: i64 = 200;

/// Fetch the wallet for a user, creating it if this is the first time money
/// moves for them.
///
/// # Process
///
/// 1. Return the existing wallet if there is one
/// 2. Otherwise insert with `ON CONFLICT (user_id) DO NOTHING`
/// 3. If the insert returned nothing, a concurrent request created the
///    wallet first; re-read and return that row
///
/// Safe to call any number of times; exactly one wallet per user ever
/// exists (`user_id` is unique).
///
/// # Errors
///
/// - `Database`: insert or lookup failed (including an unknown `user_id`,
///   which surfaces as a foreign-key violation)
pub async fn get_or_create_wallet(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Wallet, AppError> {
    if let Some(wallet) = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok(wallet);
    }

    let inserted = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(wallet) = inserted {
        return Ok(wallet);
    }

    // Lost the race: another request inserted between our two statements
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::WalletNotFound)
}

/// Fetch a user's wallet without creating one.
pub async fn find_wallet_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Wallet>, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(wallet)
}

/// Debit a wallet and record the ledger entry.
///
/// # Process
///
/// 1. Validate the amount
/// 2. One conditional UPDATE: subtract only where `balance_paise >= amount`
/// 3. Zero rows affected: re-read the balance to distinguish a missing
///    wallet from an insufficient one
/// 4. Insert the COMPLETED ledger entry with a negative amount
///
/// The check and the subtraction are the same statement, so the balance can
/// never go negative no matter how many debits race.
///
/// # Arguments
///
/// * `conn` - Caller's connection (usually inside a database transaction)
/// * `wallet_id` - Wallet to debit
/// * `user_id` - Wallet owner, recorded on the ledger entry
/// * `amount_paise` - Amount to remove (must be positive)
/// * `transaction_type` - Ledger entry kind (e.g. SCHEME_PAYMENT)
/// * `description` - Optional human-readable description
/// * `reference` - Optional causing-event id (application id, order id)
///
/// # Returns
///
/// The updated wallet and the ledger entry.
///
/// # Errors
///
/// - `InvalidRequest`: amount is zero or negative
/// - `WalletNotFound`: no such wallet
/// - `InsufficientBalance`: balance cannot cover the amount; carries both
///   the required and the available figures
/// - `Database`: query failed
pub async fn debit(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    user_id: Uuid,
    amount_paise: Paise,
    transaction_type: TransactionType,
    description: Option<String>,
    reference: Option<String>,
) -> Result<(Wallet, Transaction), AppError> {
    if amount_paise <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Wallet>(
        r#"
        UPDATE wallets
        SET balance_paise = balance_paise - $1,
            updated_at = NOW()
        WHERE id = $2 AND balance_paise >= $1
        RETURNING *
        "#,
    )
    .bind(amount_paise)
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?;

    let wallet = match updated {
        Some(wallet) => wallet,
        None => {
            // Zero rows: missing wallet or short balance. Re-read to tell
            // the two apart.
            let available =
                sqlx::query_scalar::<_, i64>("SELECT balance_paise FROM wallets WHERE id = $1")
                    .bind(wallet_id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or(AppError::WalletNotFound)?;

            return Err(AppError::InsufficientBalance {
                required_paise: amount_paise,
                available_paise: available,
            });
        }
    };

    // Negative amount: money left the wallet
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
            (wallet_id, user_id, transaction_type, amount_paise, status, description, reference)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(wallet.id)
    .bind(user_id)
    .bind(transaction_type)
    .bind(-amount_paise)
    .bind(TransactionStatus::Completed)
    .bind(description)
    .bind(reference)
    .fetch_one(&mut *conn)
    .await?;

    Ok((wallet, transaction))
}

/// Credit a wallet and record the ledger entry.
///
/// Credits have no upper bound, so the update is unconditional; zero rows
/// affected can only mean the wallet does not exist.
///
/// # Arguments
///
/// Same as [`debit`], plus `metadata` for context worth keeping with the
/// entry (deposit rows store gateway identifiers there).
///
/// # Errors
///
/// - `InvalidRequest`: amount is zero or negative
/// - `WalletNotFound`: no such wallet
/// - `Database`: query failed
#[allow(clippy::too_many_arguments)]
pub async fn credit(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    user_id: Uuid,
    amount_paise: Paise,
    transaction_type: TransactionType,
    description: Option<String>,
    reference: Option<String>,
    metadata: Option<serde_json::Value>,
) -> Result<(Wallet, Transaction), AppError> {
    if amount_paise <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        UPDATE wallets
        SET balance_paise = balance_paise + $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(amount_paise)
    .bind(wallet_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::WalletNotFound)?;

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
            (wallet_id, user_id, transaction_type, amount_paise, status, description, reference, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(wallet.id)
    .bind(user_id)
    .bind(transaction_type)
    .bind(amount_paise)
    .bind(TransactionStatus::Completed)
    .bind(description)
    .bind(reference)
    .bind(metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok((wallet, transaction))
}

/// List a wallet's ledger entries, newest first.
pub async fn list_transactions(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    limit: i64,
) -> Result<Vec<Transaction>, AppError> {
    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE wallet_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(wallet_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(transactions)
}

/// Clamp a client-supplied statement limit to something sane.
///
/// Missing or non-positive values fall back to the default page size;
/// anything above the cap is cut to the cap.
pub fn normalize_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if l >= 1 => l.min(MAX_STATEMENT_LIMIT),
        _ => DEFAULT_STATEMENT_LIMIT,
    }
}

// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use rust_decimal::Decimal;
use sevapay::db::DbPool;
use sevapay::models::application::Application;
use sevapay::models::scheme::Scheme;
use sevapay::models::transaction::TransactionType;
use sevapay::models::user::{User, UserRole};
use sevapay::models::wallet::Wallet;
use sevapay::services::wallet_service;
use uuid::Uuid;

/// Connect to the test database named by `DATABASE_URL` and bring the
/// schema up to date.
///
/// Returns `None` when no `DATABASE_URL` is set, so database-backed tests
/// skip cleanly on machines without Postgres:
///
/// ```ignore
/// let Some(pool) = common::test_pool().await? else {
///     return Ok(());
/// };
/// ```
///
/// Tests share the database but never share rows: every test creates its
/// own users, so they stay independent under parallel execution.
pub async fn test_pool() -> Result<Option<DbPool>> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Some(pool))
}

/// Create a user with the given role.
pub async fn create_user(pool: &DbPool, full_name: &str, role: UserRole) -> Result<User> {
    let user =
        sqlx::query_as::<_, User>("INSERT INTO users (full_name, role) VALUES ($1, $2) RETURNING *")
            .bind(full_name)
            .bind(role)
            .fetch_one(pool)
            .await?;
    Ok(user)
}

/// Create a scheme with the given amounts and commission rate.
pub async fn create_scheme(
    pool: &DbPool,
    name: &str,
    price_paise: i64,
    service_charge_paise: i64,
    commission_rate: Decimal,
) -> Result<Scheme> {
    let scheme = sqlx::query_as::<_, Scheme>(
        r#"
        INSERT INTO schemes (name, price_paise, service_charge_paise, commission_rate)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(price_paise)
    .bind(service_charge_paise)
    .bind(commission_rate)
    .fetch_one(pool)
    .await?;
    Ok(scheme)
}

/// Create (if needed) and fund a user's wallet with a deposit.
pub async fn fund_wallet(pool: &DbPool, user_id: Uuid, amount_paise: i64) -> Result<Wallet> {
    let mut conn = pool.acquire().await?;
    let wallet = wallet_service::get_or_create_wallet(&mut conn, user_id).await?;
    let (wallet, _) = wallet_service::credit(
        &mut conn,
        wallet.id,
        user_id,
        amount_paise,
        TransactionType::Deposit,
        Some("Test funding".to_string()),
        None,
        None,
    )
    .await?;
    Ok(wallet)
}

/// Submit an application the way the HTTP handler does: amounts and
/// commission rate snapshotted from the scheme, both state machines PENDING.
pub async fn submit_application(pool: &DbPool, user: &User, scheme: &Scheme) -> Result<Application> {
    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications
            (user_id, scheme_id, amount_paise, base_amount_paise, total_amount_paise, commission_rate)
        VALUES ($1, $2, $3, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(scheme.id)
    .bind(scheme.price_paise)
    .bind(scheme.price_paise + scheme.service_charge_paise)
    .bind(scheme.commission_rate)
    .fetch_one(pool)
    .await?;
    Ok(application)
}

/// Current application row.
pub async fn reload_application(pool: &DbPool, application_id: Uuid) -> Result<Application> {
    let application =
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(application_id)
            .fetch_one(pool)
            .await?;
    Ok(application)
}

/// Current wallet row.
pub async fn reload_wallet(pool: &DbPool, wallet_id: Uuid) -> Result<Wallet> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1")
        .bind(wallet_id)
        .fetch_one(pool)
        .await?;
    Ok(wallet)
}

/// Number of ledger entries a wallet has.
pub async fn count_transactions(pool: &DbPool, wallet_id: Uuid) -> Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE wallet_id = $1")
            .bind(wallet_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

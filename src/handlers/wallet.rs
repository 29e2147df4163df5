//! Wallet HTTP handlers.
//!
//! This module implements the wallet read endpoints:
//! - GET /wallet - Own wallet (created lazily on first access)
//! - GET /wallet/transactions - Statement, newest first

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::Transaction,
    models::wallet::{StatementQuery, Wallet},
    services::wallet_service,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

/// Get the authenticated user's wallet.
///
/// # Endpoint
///
/// `GET /wallet`
///
/// First access creates the wallet with a zero balance, so every
/// authenticated user always has one to show.
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Wallet>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let wallet = wallet_service::get_or_create_wallet(&mut conn, auth.user_id).await?;

    Ok(Json(wallet))
}

/// Get the authenticated user's statement.
///
/// # Endpoint
///
/// `GET /wallet/transactions?limit=50`
///
/// Entries come newest first. `limit` is clamped to 1..=200 and defaults
/// to 50; a brand-new wallet yields an empty list.
pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let wallet = wallet_service::get_or_create_wallet(&mut conn, auth.user_id).await?;

    let limit = wallet_service::normalize_limit(query.limit);
    let transactions = wallet_service::list_transactions(&mut conn, wallet.id, limit).await?;

    Ok(Json(transactions))
}

//! User provisioning HTTP handlers.
//!
//! This module implements the admin-only user endpoint:
//! - POST /users - Provision a user and their API key

use crate::{
    AppState,
    error::AppError,
    middleware::auth::{generate_api_key, hash_api_key},
    models::user::{CreateUserRequest, CreateUserResponse, User},
};
use axum::{Json, extract::State, http::StatusCode};

/// Provision a new user with a role and a fresh API key.
///
/// # Endpoint
///
/// `POST /users` (admin only)
///
/// # Request Body
///
/// ```json
/// {
///   "full_name": "Asha Devi",
///   "role": "RETAILER"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: User plus the plaintext API key
/// - **Error (400)**: Empty name
/// - **Error (401/403)**: Missing key / non-admin key
///
/// # Security
///
/// Only the SHA-256 hash of the key is stored. The plaintext in the
/// response is the one and only time it exists outside the caller's hands.
///
/// # Database Operation
///
/// The user row and its API key are inserted in one database transaction,
/// so a half-provisioned user (no key) can never exist.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    let full_name = request.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::InvalidRequest(
            "full_name must not be empty".to_string(),
        ));
    }

    let plaintext_key = generate_api_key();
    let key_hash = hash_api_key(&plaintext_key);

    let mut tx = state.pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (full_name, role)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(full_name)
    .bind(request.role)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO api_keys (user_id, key_hash)
        VALUES ($1, $2)
        "#,
    )
    .bind(user.id)
    .bind(&key_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "user provisioned");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user,
            api_key: plaintext_key,
        }),
    ))
}

//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! A second, thinner layer (`require_admin`) sits on admin-only routes and
//! checks the role the first layer resolved.

use crate::{
    AppState,
    error::AppError,
    models::user::UserRole,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated user
    ///
    /// Used to filter database queries (e.g., only show this user's wallet
    /// and applications)
    pub user_id: Uuid,

    /// Role of the authenticated user
    pub role: UserRole,
}

/// Row shape for the key-to-user lookup.
#[derive(sqlx::FromRow)]
struct AuthRow {
    user_id: Uuid,
    role: UserRole,
}

/// Hash an API key with SHA-256 for storage or lookup.
///
/// Only hashes ever touch the database, so a leaked table cannot be replayed
/// as credentials.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new plaintext API key (64 hex characters).
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`, joined to
///    the owning user for the role
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
///
/// # Arguments
///
/// * `State(state)` - Shared application state injected by Axum
/// * `request` - Incoming HTTP request (mutable to add extensions)
/// * `next` - Next middleware/handler in the chain
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::InvalidApiKey)` if authentication fails (returns 401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    // Step 2: Extract Bearer token
    // Expected format: "Bearer <api_key>"
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidApiKey)?;

    // Step 3: Hash the API key using SHA-256
    let key_hash = hash_api_key(api_key);

    // Step 4: Lookup hashed key in database, joined to the owning user
    let row = sqlx::query_as::<_, AuthRow>(
        r#"
        SELECT u.id AS user_id, u.role
        FROM api_keys k
        JOIN users u ON u.id = k.user_id
        WHERE k.key_hash = $1 AND k.is_active = true
        "#,
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    // Step 5: Create authentication context
    let auth_context = AuthContext {
        user_id: row.user_id,
        role: row.role,
    };

    // Step 6: Inject context into request extensions
    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    // Step 7: Call the next middleware/handler
    Ok(next.run(request).await)
}

/// Admin gate for provisioning and review routes.
///
/// Must sit inside `auth_middleware`, which populates the `AuthContext`
/// this reads. A valid key with the wrong role gets 403, not 401.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<AuthContext>()
        .is_some_and(|ctx| ctx.role == UserRole::Admin);

    if !is_admin {
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

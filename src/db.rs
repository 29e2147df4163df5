//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Provisioning the bootstrap admin on a fresh database

use sqlx::{Pool, Postgres};

use crate::middleware::auth::hash_api_key;
use crate::models::api_key::ApiKey;
use crate::models::user::{User, UserRole};

/// Type alias for PostgreSQL connection pool.
///
/// Instead of writing `Pool<Postgres>` everywhere, we can use `DbPool`.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// A connection pool maintains multiple database connections that can be reused across HTTP requests which is much more efficient than opening a new connection for each request.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
///
/// # Configuration
///
/// - Maximum connections: 5 (configurable via PgPoolOptions)
/// - Connections are created lazily as needed
/// - Idle connections are kept alive for reuse
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        // Limit concurrent connections
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// This function executes all SQL migration files in order. Migrations are tracked in a special `_sqlx_migrations` table, so each migration runs only once.
///
/// # Arguments
///
/// * `pool` - Database connection pool
///
/// # Migration Files
///
/// Migration files must be in `migrations/` directory with format:
/// - `<timestamp>_<name>.sql` (e.g., `20250101000001_create_users.sql`)
///
/// # Errors
///
/// Returns an error if:
/// - Migration files cannot be read
/// - SQL syntax errors in migration files
/// - Database errors during migration execution
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

/// Provision an admin user for the configured bootstrap key, if none exists.
///
/// A fresh database has no users and no API keys, so every authenticated
/// endpoint (including user provisioning itself) would be unreachable. When
/// `BOOTSTRAP_ADMIN_KEY` is configured, this creates one admin user whose
/// API key is that value. Idempotent: if the key's hash is already present,
/// nothing happens, so restarts are safe.
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `plaintext_key` - The bootstrap API key from configuration
///
/// # Errors
///
/// Returns an error if the lookup or the user/key inserts fail.
pub async fn ensure_bootstrap_admin(pool: &DbPool, plaintext_key: &str) -> Result<(), sqlx::Error> {
    let key_hash = hash_api_key(plaintext_key);

    let existing = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_hash = $1")
        .bind(&key_hash)
        .fetch_optional(pool)
        .await?;
    if let Some(key) = existing {
        tracing::debug!(user_id = %key.user_id, "bootstrap admin already provisioned");
        return Ok(());
    }

    // User and key must appear together or not at all
    let mut tx = pool.begin().await?;

    let admin = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (full_name, role)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind("Bootstrap Admin")
    .bind(UserRole::Admin)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO api_keys (user_id, key_hash)
        VALUES ($1, $2)
        "#,
    )
    .bind(admin.id)
    .bind(&key_hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %admin.id, "bootstrap admin provisioned");
    Ok(())
}

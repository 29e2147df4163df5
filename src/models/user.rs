//! Platform users and their roles.
//!
//! This module defines:
//! - `UserRole`: the role enum stored in Postgres
//! - `User`: Database entity representing a user
//! - Request/response types for admin user provisioning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role attached to every user.
///
/// Roles drive two behaviours:
/// - `Admin` is required for provisioning and application review endpoints
/// - `Retailer` is the only role that earns scheme commissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Retailer,
    Customer,
    Admin,
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Wallets, applications, and API keys all hang
/// off a user row via `user_id` foreign keys.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Display name
    pub full_name: String,

    /// Role deciding endpoint access and commission eligibility
    pub role: UserRole,

    /// Timestamp when the user was created
    pub created_at: DateTime<Utc>,
}

/// Request body for provisioning a user (admin only).
///
/// # JSON Example
///
/// ```json
/// {
///   "full_name": "Asha Devi",
///   "role": "RETAILER"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name for the new user
    pub full_name: String,

    /// Role the user is provisioned with
    pub role: UserRole,
}

/// Response body for user provisioning.
///
/// Carries the plaintext API key exactly once. Only its SHA-256 hash is
/// stored, so the key cannot be recovered after this response.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    /// The newly created user
    pub user: User,

    /// Plaintext API key for the user. Save it now; it is not shown again.
    pub api_key: String,
}

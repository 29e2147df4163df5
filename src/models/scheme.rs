//! Government-service scheme catalog.
//!
//! This module defines:
//! - `Scheme`: Database entity representing a catalog entry
//! - `CreateSchemeRequest`: Request body for adding schemes (admin only)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a scheme record from the database.
///
/// # Database Table
///
/// Maps to the `schemes` table. Applications snapshot a scheme's amounts at
/// submission time, so later price edits never change what an existing
/// application owes.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Scheme {
    /// Unique identifier for this scheme
    pub id: Uuid,

    /// Human-readable scheme name (e.g. "PAN Card Application")
    pub name: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Government fee for the service, in paise
    pub price_paise: i64,

    /// Platform service charge added on top of the price, in paise
    pub service_charge_paise: i64,

    /// Retailer commission as a percentage of the scheme price
    ///
    /// Stored as NUMERIC(5,2): 10.00 means 10%. Kept decimal end to end so
    /// commission maths never loses precision to floats.
    pub commission_rate: Decimal,

    /// Inactive schemes are hidden from listings and closed to new applications
    pub is_active: bool,

    /// Timestamp when the scheme was created
    pub created_at: DateTime<Utc>,
}

/// Request body for adding a scheme to the catalog (admin only).
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Income Certificate",
///   "description": "State income certificate application",
///   "price_paise": 12000,
///   "service_charge_paise": 3000,
///   "commission_rate": "10.00"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateSchemeRequest {
    /// Scheme name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Government fee in paise
    pub price_paise: i64,

    /// Service charge in paise (defaults to 0)
    #[serde(default)]
    pub service_charge_paise: i64,

    /// Retailer commission percentage (defaults to 0)
    #[serde(default)]
    pub commission_rate: Decimal,
}

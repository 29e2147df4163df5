//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `WEBHOOK_SECRET` (optional): shared secret for verifying payment
///   gateway webhook signatures; when unset, signatures are not checked
/// - `GATEWAY_FEE_BPS` (optional): recharge surcharge in basis points,
///   defaults to 236 (2% gateway fee plus 18% GST on that fee)
/// - `BOOTSTRAP_ADMIN_KEY` (optional): plaintext API key provisioned for an
///   initial admin user at startup, so a fresh database is administrable
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub webhook_secret: Option<String>,

    #[serde(default = "default_gateway_fee_bps")]
    pub gateway_fee_bps: i64,

    pub bootstrap_admin_key: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default recharge surcharge: 2.00% gateway fee + 18% GST on the fee = 2.36%.
fn default_gateway_fee_bps() -> i64 {
    236
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}

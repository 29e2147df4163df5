//! Sevapay - wallet ledger backend for a government-services retailer platform.
//!
//! Retailers and customers apply for schemes, admins review the
//! applications, and a per-user wallet carries every rupee involved:
//! application payments, rejection refunds, retailer commissions, and
//! gateway recharges. The ledger is append-only and all balances are
//! integer paise.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing, role-gated admin routes
//! - **Webhooks**: HMAC-SHA256 signature gate on the gateway callback
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::DbPool;

/// Shared state handed to every handler and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: DbPool,

    /// Runtime configuration (webhook secret, gateway fee, ...)
    pub config: Config,
}

/// Build the application router.
///
/// Three rings:
/// - public: health check and the signature-gated gateway webhook
/// - authenticated: wallet, catalog, and application routes behind the
///   API-key middleware
/// - admin: provisioning and the decision endpoint, additionally behind
///   the role gate
pub fn app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users", post(handlers::users::create_user))
        .route("/schemes", post(handlers::schemes::create_scheme))
        .route(
            "/applications/{id}",
            put(handlers::applications::decide_application),
        )
        // Role check runs after the auth layer below has resolved the user
        .route_layer(axum_middleware::from_fn(middleware::auth::require_admin));

    let authenticated_routes = Router::new()
        .route("/schemes", get(handlers::schemes::list_schemes))
        .route(
            "/applications",
            post(handlers::applications::submit_application),
        )
        .route(
            "/applications",
            get(handlers::applications::list_applications),
        )
        .route(
            "/applications/{id}",
            get(handlers::applications::get_application),
        )
        .route(
            "/applications/{id}/pay",
            post(handlers::applications::pay_application),
        )
        .route("/wallet", get(handlers::wallet::get_wallet))
        .route(
            "/wallet/transactions",
            get(handlers::wallet::list_wallet_transactions),
        )
        .route(
            "/wallet/payments",
            post(handlers::payments::create_payment_order),
        )
        .merge(admin_routes)
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/wallet/payments/webhook",
            post(handlers::payments::payment_webhook),
        )
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}

//! Scheme catalog HTTP handlers.
//!
//! This module implements the catalog endpoints:
//! - POST /schemes - Add a scheme (admin only)
//! - GET /schemes - List active schemes

use crate::{
    AppState,
    error::AppError,
    models::scheme::{CreateSchemeRequest, Scheme},
};
use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;

/// Add a scheme to the catalog.
///
/// # Endpoint
///
/// `POST /schemes` (admin only)
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Income Certificate",
///   "price_paise": 12000,
///   "service_charge_paise": 3000,
///   "commission_rate": "10.00"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The created scheme
/// - **Error (400)**: Empty name, negative amounts, or a commission rate
///   outside 0..=100
pub async fn create_scheme(
    State(state): State<AppState>,
    Json(request): Json<CreateSchemeRequest>,
) -> Result<(StatusCode, Json<Scheme>), AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest(
            "name must not be empty".to_string(),
        ));
    }
    if request.price_paise < 0 || request.service_charge_paise < 0 {
        return Err(AppError::InvalidRequest(
            "Amounts must not be negative".to_string(),
        ));
    }
    if request.commission_rate < Decimal::ZERO || request.commission_rate > Decimal::ONE_HUNDRED {
        return Err(AppError::InvalidRequest(
            "commission_rate must be between 0 and 100".to_string(),
        ));
    }

    let scheme = sqlx::query_as::<_, Scheme>(
        r#"
        INSERT INTO schemes (name, description, price_paise, service_charge_paise, commission_rate)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(request.description)
    .bind(request.price_paise)
    .bind(request.service_charge_paise)
    .bind(request.commission_rate)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(scheme)))
}

/// List the active catalog.
///
/// # Endpoint
///
/// `GET /schemes`
///
/// Inactive schemes stay queryable through existing applications but are
/// not offered here.
pub async fn list_schemes(State(state): State<AppState>) -> Result<Json<Vec<Scheme>>, AppError> {
    let schemes =
        sqlx::query_as::<_, Scheme>("SELECT * FROM schemes WHERE is_active = true ORDER BY name")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(schemes))
}

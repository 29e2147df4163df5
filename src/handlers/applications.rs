//! Application HTTP handlers.
//!
//! This module implements the application lifecycle endpoints:
//! - POST /applications - Submit an application for a scheme
//! - GET /applications - List own applications (admins: all)
//! - GET /applications/{id} - Get one application
//! - POST /applications/{id}/pay - Pay for a pending application up front
//! - PUT /applications/{id} - Admin decision (approve / reject)
//!
//! The decision endpoint is where money moves: approval collects the
//! payment and pays retailer commission, rejection optionally refunds. All
//! movement is delegated to the approval service, which makes each piece
//! idempotent; this layer owns request validation, ownership checks, and
//! the review-status transition itself.

use crate::{
    AppState,
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::application::{
        Application, ApplicationStatus, DecisionRequest, DecisionResponse, ListApplicationsQuery,
        PayApplicationResponse, SubmitApplicationRequest,
    },
    models::scheme::Scheme,
    models::user::UserRole,
    services::approval_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Submit an application for an active scheme.
///
/// # Endpoint
///
/// `POST /applications`
///
/// # Request Body
///
/// ```json
/// {
///   "scheme_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The new application, PENDING on both state
///   machines, with the scheme's price, total, and commission rate
///   snapshotted
/// - **Error (404)**: Scheme missing or inactive
///
/// Nothing is charged at submission; payment happens through the pay
/// endpoint or at approval.
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let scheme =
        sqlx::query_as::<_, Scheme>("SELECT * FROM schemes WHERE id = $1 AND is_active = true")
            .bind(request.scheme_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::SchemeNotFound)?;

    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications
            (user_id, scheme_id, amount_paise, base_amount_paise, total_amount_paise, commission_rate)
        VALUES ($1, $2, $3, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(scheme.id)
    .bind(scheme.price_paise)
    .bind(scheme.price_paise + scheme.service_charge_paise)
    .bind(scheme.commission_rate)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(application)))
}

/// List applications, newest first.
///
/// # Endpoint
///
/// `GET /applications?status=PENDING`
///
/// Admins see every application; everyone else sees only their own. The
/// optional `status` filter narrows to one review state.
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<Application>>, AppError> {
    let applications = if auth.role == UserRole::Admin {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE ($1::application_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(query.status)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE user_id = $1 AND ($2::application_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(auth.user_id)
        .bind(query.status)
        .fetch_all(&state.pool)
        .await?
    };

    Ok(Json(applications))
}

/// Get a single application.
///
/// # Endpoint
///
/// `GET /applications/{id}`
///
/// # Security Note
///
/// Non-admins get 404 for applications they don't own, the same as for ids
/// that don't exist, so the endpoint never confirms another user's
/// application exists.
pub async fn get_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(application_id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    let application = find_visible_application(&state.pool, &auth, application_id).await?;
    Ok(Json(application))
}

/// Pay for a still-pending application from the wallet.
///
/// # Endpoint
///
/// `POST /applications/{id}/pay`
///
/// Lets an applicant settle up front instead of at approval time. Paying
/// an application that is already paid, or one with a zero total, is a
/// success no-op with the optional fields absent.
///
/// # Response
///
/// - **Success (200 OK)**: `{success, application, wallet?, payment_transaction?}`
/// - **Error (400)**: Decided application, or insufficient balance (the
///   message carries required and available amounts)
/// - **Error (404)**: Not the caller's application, or no wallet
pub async fn pay_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(application_id): Path<Uuid>,
) -> Result<Json<PayApplicationResponse>, AppError> {
    let application = find_visible_application(&state.pool, &auth, application_id).await?;

    if application.status != ApplicationStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "Cannot pay an application that is already {}",
            application.status
        )));
    }

    let collected = approval_service::collect_payment(&state.pool, &application).await?;
    let application = reload_application(&state.pool, application.id).await?;

    Ok(Json(PayApplicationResponse {
        success: true,
        application,
        wallet: collected.as_ref().map(|(wallet, _)| wallet.clone()),
        payment_transaction: collected.map(|(_, transaction)| transaction),
    }))
}

/// Decide an application: approve or reject.
///
/// # Endpoint
///
/// `PUT /applications/{id}` (admin only)
///
/// # Request Body
///
/// ```json
/// {
///   "status": "APPROVED",
///   "notes": "Documents verified",
///   "refund": false
/// }
/// ```
///
/// # Approval
///
/// Money moves before the status does: the payment is collected (no-op if
/// already paid) and the retailer commission credited (at most once). Only
/// when both succeed is PENDING → APPROVED claimed. Any failure leaves the
/// application PENDING and un-decided.
///
/// # Rejection
///
/// With `refund: true`, an already-collected payment is returned to the
/// applicant's wallet before PENDING → REJECTED is claimed. A rejection
/// whose refund fails is not recorded.
///
/// # Idempotency
///
/// Repeating a decision that already stands returns success and changes
/// nothing, except that a repeated rejection still honors `refund: true`.
/// Concurrent conflicting decisions are not ordered: an approval can
/// collect its payment yet lose the status claim to a rejection, and
/// re-rejecting with `refund: true` is how an admin returns that payment.
/// A conflicting decision (rejecting an approved application and vice
/// versa) is a 400.
pub async fn decide_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let application =
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(application_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::ApplicationNotFound)?;

    match request.status {
        ApplicationStatus::Approved => approve(&state.pool, application, request.notes).await,
        ApplicationStatus::Rejected => {
            reject(&state.pool, application, request.notes, request.refund).await
        }
        _ => Err(AppError::InvalidRequest(
            "Decision must be APPROVED or REJECTED".to_string(),
        )),
    }
}

/// Approval flow: side effects first, then the status claim.
async fn approve(
    pool: &DbPool,
    application: Application,
    notes: Option<String>,
) -> Result<Json<DecisionResponse>, AppError> {
    // Repeating the decision that already stands is a no-op
    if application.status == ApplicationStatus::Approved {
        return Ok(Json(DecisionResponse {
            success: true,
            application,
            wallet: None,
            refund_transaction: None,
        }));
    }
    if !application.status.can_transition_to(ApplicationStatus::Approved) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot approve an application that is already {}",
            application.status
        )));
    }

    let outcome = approval_service::process_approval_side_effects(pool, &application).await?;

    let updated = claim_status(pool, &application, ApplicationStatus::Approved, notes).await?;
    let application = match updated {
        Some(application) => application,
        None => {
            // A concurrent decision landed between our read and the claim
            let current = reload_application(pool, application.id).await?;
            if current.status != ApplicationStatus::Approved {
                return Err(AppError::InvalidTransition(
                    "Application was decided concurrently with a different outcome".to_string(),
                ));
            }
            current
        }
    };

    Ok(Json(DecisionResponse {
        success: true,
        application,
        wallet: outcome.wallet,
        refund_transaction: None,
    }))
}

/// Rejection flow: optional refund first, then the status claim.
async fn reject(
    pool: &DbPool,
    application: Application,
    notes: Option<String>,
    refund: bool,
) -> Result<Json<DecisionResponse>, AppError> {
    if application.status == ApplicationStatus::Rejected {
        // Repeat decision, but a refund request is still honored: a racing
        // approval can collect its payment and lose the status claim,
        // leaving a REJECTED application PAID until an admin re-rejects
        // with refund on
        let refunded =
            approval_service::process_rejection_refund(pool, &application, refund).await?;
        let application = reload_application(pool, application.id).await?;
        return Ok(Json(DecisionResponse {
            success: true,
            application,
            wallet: refunded.as_ref().map(|(wallet, _)| wallet.clone()),
            refund_transaction: refunded.map(|(_, transaction)| transaction),
        }));
    }
    if !application.status.can_transition_to(ApplicationStatus::Rejected) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot reject an application that is already {}",
            application.status
        )));
    }

    let refunded = approval_service::process_rejection_refund(pool, &application, refund).await?;

    let updated = claim_status(pool, &application, ApplicationStatus::Rejected, notes).await?;
    let application = match updated {
        Some(application) => application,
        None => {
            let current = reload_application(pool, application.id).await?;
            if current.status != ApplicationStatus::Rejected {
                return Err(AppError::InvalidTransition(
                    "Application was decided concurrently with a different outcome".to_string(),
                ));
            }
            current
        }
    };

    Ok(Json(DecisionResponse {
        success: true,
        application,
        wallet: refunded.as_ref().map(|(wallet, _)| wallet.clone()),
        refund_transaction: refunded.map(|(_, transaction)| transaction),
    }))
}

/// Claim PENDING → `next` for a decision. `None` means the claim lost a race.
async fn claim_status(
    pool: &DbPool,
    application: &Application,
    next: ApplicationStatus,
    notes: Option<String>,
) -> Result<Option<Application>, AppError> {
    let updated = sqlx::query_as::<_, Application>(
        r#"
        UPDATE applications
        SET status = $1,
            review_notes = COALESCE($2, review_notes),
            updated_at = NOW()
        WHERE id = $3 AND status = $4
        RETURNING *
        "#,
    )
    .bind(next)
    .bind(notes)
    .bind(application.id)
    .bind(ApplicationStatus::Pending)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Fetch an application the caller is allowed to see. Admins see all;
/// everyone else only their own, with foreign ids indistinguishable from
/// missing ones.
async fn find_visible_application(
    pool: &DbPool,
    auth: &AuthContext,
    application_id: Uuid,
) -> Result<Application, AppError> {
    let application = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    if auth.role != UserRole::Admin && application.user_id != auth.user_id {
        return Err(AppError::ApplicationNotFound);
    }

    Ok(application)
}

/// Current row for a known-good id.
async fn reload_application(pool: &DbPool, application_id: Uuid) -> Result<Application, AppError> {
    sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::ApplicationNotFound)
}

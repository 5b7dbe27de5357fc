//! Override request HTTP handlers.
//!
//! This module implements the override workflow endpoints:
//! - POST /api/v1/overrides - Propose a correction to a transaction
//! - GET /api/v1/overrides - List override requests (filterable)
//! - POST /api/v1/overrides/:id/approve - Approve a pending request
//! - POST /api/v1/overrides/:id/reject - Reject a pending request

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::override_request::{
        OverrideRequest, ProposeOverrideRequest, ReviewOutcome, ReviewOverrideRequest,
    },
    services::override_service::{self, ReviewDecision},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Propose an override against an existing transaction.
///
/// The requester is taken from the bearer token. Unknown keys in
/// `changes` are silently dropped; structurally invalid values are a
/// 400. Nothing is applied to the ledger until a reviewer approves.
///
/// # Request Body
///
/// ```json
/// {
///   "transaction_id": "770e8400-...",
///   "reason": "Amount was recorded from the wrong invoice",
///   "changes": { "amount": "25.00" }
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the pending request with its filtered
///   change set
/// - **Error (400)**: empty reason, malformed changes, unknown fund
///   account in `changes`
/// - **Error (404)**: transaction or requesting user not found
pub async fn propose_override(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ProposeOverrideRequest>,
) -> Result<(StatusCode, Json<OverrideRequest>), AppError> {
    let created = override_service::propose(
        &pool,
        request.transaction_id,
        auth.user_id,
        &request.reason,
        &request.changes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Query parameters for listing override requests.
#[derive(Debug, Deserialize)]
pub struct OverrideListQuery {
    pub status: Option<String>,
    pub transaction_id: Option<Uuid>,
    pub requested_by: Option<Uuid>,
}

/// List override requests, newest first, with optional filters.
pub async fn list_overrides(
    State(pool): State<DbPool>,
    Query(query): Query<OverrideListQuery>,
) -> Result<Json<Vec<OverrideRequest>>, AppError> {
    let requests = override_service::list(
        &pool,
        query.status.as_deref(),
        query.transaction_id,
        query.requested_by,
    )
    .await?;
    Ok(Json(requests))
}

/// Approve a pending override request.
///
/// Applies the stored change set to the target transaction and re-posts
/// its balance contribution, all in one atomic unit with the status
/// transition.
///
/// # Response
///
/// - **Success (200 OK)**: `{override_id, transaction_id, status}`
/// - **Error (403)**: reviewer is not an Admin or reviewed their own request
/// - **Error (404)**: no such request
/// - **Error (409)**: already approved or rejected
/// - **Error (422)**: approval would drive an account balance negative
pub async fn approve_override(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(override_id): Path<Uuid>,
    body: Option<Json<ReviewOverrideRequest>>,
) -> Result<Json<ReviewOutcome>, AppError> {
    let notes = body.and_then(|Json(b)| b.review_notes);
    let outcome =
        override_service::review(&pool, override_id, &auth, ReviewDecision::Approve, notes)
            .await?;
    Ok(Json(outcome))
}

/// Reject a pending override request.
///
/// Records the outcome only; the ledger and balances are untouched.
pub async fn reject_override(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(override_id): Path<Uuid>,
    body: Option<Json<ReviewOverrideRequest>>,
) -> Result<Json<ReviewOutcome>, AppError> {
    let notes = body.and_then(|Json(b)| b.review_notes);
    let outcome =
        override_service::review(&pool, override_id, &auth, ReviewDecision::Reject, notes)
            .await?;
    Ok(Json(outcome))
}

//! Fund account HTTP handlers.
//!
//! This module implements the fund-account API endpoints:
//! - POST /api/v1/fund-accounts - Create new fund account
//! - GET /api/v1/fund-accounts - List all fund accounts
//! - GET /api/v1/fund-accounts/:id - Get fund account by ID
//! - GET /api/v1/fund-accounts/:id/audit - Balance consistency check

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::fund_account::{BalanceAudit, CreateFundAccountRequest, FundAccountResponse},
    services::fund_account_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Create a new fund account.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "General Fund",
///   "code": "GF-001",
///   "account_type": "Revenue",
///   "department": "Treasury",
///   "initial_balance": "100.00"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the created account, balance equal to
///   the initial balance
/// - **Error (400)**: duplicate code, unknown account type, or negative
///   initial balance
pub async fn create_fund_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateFundAccountRequest>,
) -> Result<(StatusCode, Json<FundAccountResponse>), AppError> {
    let initial_balance_cents = match &request.initial_balance {
        Some(raw) => raw.to_cents().ok_or_else(|| {
            AppError::InvalidRequest(
                "Initial balance must be a non-negative amount with at most two decimal places"
                    .to_string(),
            )
        })?,
        None => 0,
    };

    let account = fund_account_service::create_account(
        &pool,
        &request.name,
        &request.code,
        &request.account_type,
        request.department,
        request.description,
        initial_balance_cents,
        auth.user_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Get a specific fund account by ID.
///
/// Returns 404 if the account does not exist.
pub async fn get_fund_account(
    State(pool): State<DbPool>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<FundAccountResponse>, AppError> {
    let account = fund_account_service::get_account(&pool, account_id).await?;
    Ok(Json(account.into()))
}

/// List all fund accounts, newest first.
pub async fn list_fund_accounts(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<FundAccountResponse>>, AppError> {
    let accounts = fund_account_service::list_accounts(&pool).await?;
    let responses: Vec<FundAccountResponse> = accounts.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Recompute an account's balance from ledger history.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "recorded_balance_cents": 7500,
///   "computed_balance_cents": 7500,
///   "consistent": true
/// }
/// ```
pub async fn audit_fund_account(
    State(pool): State<DbPool>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<BalanceAudit>, AppError> {
    let audit = fund_account_service::audit_balance(&pool, account_id).await?;
    if !audit.consistent {
        tracing::warn!(%account_id, "fund account balance does not match ledger history");
    }
    Ok(Json(audit))
}

//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions - Record a disbursement or collection
//! - GET /api/v1/transactions - List transactions
//! - GET /api/v1/transactions/:id - Get transaction details

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{CreateTransactionRequest, TransactionResponse},
    services::transaction_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Record a transaction.
///
/// # Request Body
///
/// ```json
/// {
///   "type": "Disburse",
///   "amount": "40.00",
///   "description": "Office supplies",
///   "recipient": "Acme Supplies Inc",
///   "department": "Administration",
///   "category": "Supplies",
///   "mode_of_payment": "Check",
///   "fund_account_id": "550e8400-..."
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the recorded transaction; if a fund
///   account was referenced its balance has been adjusted in the same
///   atomic unit
/// - **Error (400)**: bad type/amount or missing fields
/// - **Error (422)**: insufficient funds for a disbursement
pub async fn create_transaction(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction =
        transaction_service::create_transaction(&pool, &request, auth.user_id).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub fund_account_id: Option<Uuid>,
}

/// List transactions, newest first, optionally filtered by fund account.
pub async fn list_transactions(
    State(pool): State<DbPool>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions =
        transaction_service::list_transactions(&pool, query.fund_account_id).await?;
    let responses: Vec<TransactionResponse> = transactions.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Get transaction by ID.
pub async fn get_transaction(
    State(pool): State<DbPool>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = transaction_service::get_transaction_by_id(&pool, transaction_id)
        .await?
        .ok_or(AppError::TransactionNotFound)?;

    Ok(Json(transaction.into()))
}

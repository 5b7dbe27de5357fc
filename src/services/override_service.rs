//! Override workflow engine - The propose/review state machine.
//!
//! Proposing is purely additive bookkeeping: any authenticated user can
//! file a request and nothing financial moves. Review is the only point
//! of ledger mutation, and it is guarded three ways:
//!
//! - a conditional `UPDATE ... WHERE status = 'pending'` decides the
//!   winner when two reviewers race, so at most one outcome transition
//!   ever happens;
//! - the status transition, the transaction patch, and the balance
//!   deltas commit as one database transaction, so a crash mid-approval
//!   leaves the system in the pre-approval state;
//! - approval re-runs the create-path validation, so an override cannot
//!   drive an account negative or move a transaction onto an inactive
//!   account. A failed re-validation rolls everything back and the
//!   request stays pending.

use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        override_request::{OverrideRequest, OverrideStatus, ReviewOutcome, TransactionChanges},
        transaction::Transaction,
        user::{REVIEWER_ROLE, User},
    },
    services::transaction_service,
};

/// A reviewer's decision on a pending override request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    fn terminal_status(self) -> OverrideStatus {
        match self {
            Self::Approve => OverrideStatus::Approved,
            Self::Reject => OverrideStatus::Rejected,
        }
    }
}

/// File an override request against an existing transaction.
///
/// # Process
///
/// 1. Require a non-empty reason
/// 2. Verify the transaction and the requesting user exist
/// 3. Filter the raw changes to the whitelist (unknown keys dropped,
///    structurally invalid values rejected)
/// 4. Verify a proposed fund account reassignment target exists
/// 5. Insert with `status = 'pending'`
///
/// No balance is touched here.
///
/// # Errors
///
/// - `TransactionNotFound` / `UserNotFound`
/// - `InvalidRequest`: empty reason, malformed changes, no whitelisted
///   change present, unknown fund account
/// - `Database`: database error occurred
pub async fn propose(
    pool: &DbPool,
    transaction_id: Uuid,
    requested_by: Uuid,
    reason: &str,
    raw_changes: &Value,
) -> Result<OverrideRequest, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::InvalidRequest("Reason is required".to_string()));
    }

    let transaction_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM transactions WHERE id = $1)")
            .bind(transaction_id)
            .fetch_one(pool)
            .await?;
    if !transaction_exists {
        return Err(AppError::TransactionNotFound);
    }

    let requester = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(requested_by)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let changes = TransactionChanges::from_raw(raw_changes).map_err(AppError::InvalidRequest)?;
    if changes.is_empty() {
        return Err(AppError::InvalidRequest(
            "Changes must include at least one overridable field".to_string(),
        ));
    }

    if let Some(account_id) = changes.fund_account_id {
        let account_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fund_accounts WHERE id = $1)")
                .bind(account_id)
                .fetch_one(pool)
                .await?;
        if !account_exists {
            return Err(AppError::InvalidRequest(
                "Invalid fund account ID".to_string(),
            ));
        }
    }

    let request = sqlx::query_as::<_, OverrideRequest>(
        r#"
        INSERT INTO override_requests (transaction_id, requested_by, reason, changes, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING *
        "#,
    )
    .bind(transaction_id)
    .bind(requested_by)
    .bind(reason)
    .bind(sqlx::types::Json(&changes))
    .fetch_one(pool)
    .await?;

    tracing::info!(
        override_id = %request.id,
        %transaction_id,
        requested_by = %requester.name,
        "override request created"
    );

    Ok(request)
}

/// Decide a pending override request.
///
/// Rejection records the outcome and touches nothing else. Approval
/// additionally patches the target transaction and re-posts its balance
/// contribution, all inside the same database transaction as the status
/// update.
///
/// # Reviewer gating
///
/// Only an Admin may review, and never their own request.
///
/// # Errors
///
/// - `Forbidden`: reviewer is not an Admin, or is the requester
/// - `OverrideNotFound`: no such request
/// - `OverrideAlreadyProcessed`: another reviewer got there first
/// - `AccountNotFound` / `InactiveAccount` / `InsufficientFunds` /
///   `InvalidRequest`: approval failed re-validation (request stays
///   pending)
/// - `Database`: database error occurred
pub async fn review(
    pool: &DbPool,
    override_id: Uuid,
    reviewer: &AuthContext,
    decision: ReviewDecision,
    notes: Option<String>,
) -> Result<ReviewOutcome, AppError> {
    if reviewer.role != REVIEWER_ROLE {
        return Err(AppError::Forbidden(
            "Only an Admin may review override requests".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Conditional update: whoever matches the pending row wins; the
    // loser sees zero rows and never mutates anything
    let request = sqlx::query_as::<_, OverrideRequest>(
        r#"
        UPDATE override_requests
        SET status = $2,
            reviewed_by = $3,
            review_notes = $4,
            reviewed_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(override_id)
    .bind(decision.terminal_status().as_str())
    .bind(reviewer.user_id)
    .bind(notes)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(request) = request else {
        tx.rollback().await?;
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM override_requests WHERE id = $1)")
                .bind(override_id)
                .fetch_one(pool)
                .await?;
        return Err(if exists {
            AppError::OverrideAlreadyProcessed
        } else {
            AppError::OverrideNotFound
        });
    };

    if request.requested_by == reviewer.user_id {
        // Roll back the status transition; the request stays pending
        tx.rollback().await?;
        return Err(AppError::Forbidden(
            "Requesters may not review their own override request".to_string(),
        ));
    }

    if decision == ReviewDecision::Reject {
        tx.commit().await?;
        tracing::info!(
            %override_id,
            reviewer_id = %reviewer.user_id,
            "override request rejected"
        );
        return Ok(ReviewOutcome {
            override_id,
            transaction_id: request.transaction_id,
            status: OverrideStatus::Rejected.as_str().to_string(),
        });
    }

    // Approval path: lock the ledger row, then patch it and re-post its
    // balance contribution on the same database transaction
    let transaction = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(request.transaction_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::TransactionNotFound)?;

    transaction_service::apply_changes(&mut tx, &transaction, &request.changes.0).await?;

    // Status transition, field patch, and balance deltas commit as one
    // unit; any failure above rolled all of them back
    tx.commit().await?;

    tracing::info!(
        %override_id,
        transaction_id = %request.transaction_id,
        reviewer_id = %reviewer.user_id,
        "override request approved"
    );

    Ok(ReviewOutcome {
        override_id,
        transaction_id: request.transaction_id,
        status: OverrideStatus::Approved.as_str().to_string(),
    })
}

/// List override requests, newest first, with optional filters.
pub async fn list(
    pool: &DbPool,
    status: Option<&str>,
    transaction_id: Option<Uuid>,
    requested_by: Option<Uuid>,
) -> Result<Vec<OverrideRequest>, AppError> {
    let status = match status {
        Some(raw) => Some(
            OverrideStatus::parse(raw)
                .ok_or_else(|| {
                    AppError::InvalidRequest(
                        "Status must be one of: pending, approved, rejected".to_string(),
                    )
                })?
                .as_str(),
        ),
        None => None,
    };

    let requests = sqlx::query_as::<_, OverrideRequest>(
        r#"
        SELECT * FROM override_requests
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR transaction_id = $2)
          AND ($3::uuid IS NULL OR requested_by = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status)
    .bind(transaction_id)
    .bind(requested_by)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

//! Fund account store - Creation, lookup, and atomic balance adjustment.
//!
//! The account balance is the single most contended value in the system.
//! No code path overwrites it wholesale: every writer goes through
//! [`adjust_balance`], which applies a signed delta with a single
//! `UPDATE ... SET current_balance_cents = current_balance_cents + $n`
//! statement, always inside the same database transaction as the ledger
//! event that justifies the delta. This makes the balance reconstructable
//! from ledger history, which [`audit_balance`] exploits as a consistency
//! check.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::fund_account::{AccountType, BalanceAudit, FundAccount},
};

/// Create a fund account.
///
/// The fund code must be unused, the account type must be one of the
/// recognized five, and the opening balance must not be negative. On
/// success the current balance starts equal to the initial balance.
///
/// # Errors
///
/// - `DuplicateCode`: the fund code is already taken
/// - `InvalidRequest`: bad account type or empty name/code
/// - `Database`: database error occurred
pub async fn create_account(
    pool: &DbPool,
    name: &str,
    code: &str,
    account_type: &str,
    department: Option<String>,
    description: Option<String>,
    initial_balance_cents: i64,
    created_by: Uuid,
) -> Result<FundAccount, AppError> {
    let name = name.trim();
    let code = code.trim();
    if name.is_empty() || code.is_empty() {
        return Err(AppError::InvalidRequest(
            "Name and code are required".to_string(),
        ));
    }

    let account_type = AccountType::parse(account_type.trim()).ok_or_else(|| {
        AppError::InvalidRequest(
            "Invalid account type. Must be one of: Revenue, Expense, Asset, Liability, Equity"
                .to_string(),
        )
    })?;

    // parse_amount_cents already rejects negatives for API input; this
    // guards direct callers
    if initial_balance_cents < 0 {
        return Err(AppError::InvalidRequest(
            "Initial balance cannot be negative".to_string(),
        ));
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fund_accounts WHERE code = $1)")
        .bind(code)
        .fetch_one(pool)
        .await?;
    if exists {
        return Err(AppError::DuplicateCode);
    }

    let account = sqlx::query_as::<_, FundAccount>(
        r#"
        INSERT INTO fund_accounts (
            name,
            code,
            account_type,
            department,
            description,
            initial_balance_cents,
            current_balance_cents,
            created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(account_type.as_str())
    .bind(department)
    .bind(description)
    .bind(initial_balance_cents)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        // The unique index still wins the create/create race the
        // pre-check cannot see
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateCode,
            _ => AppError::Database(err),
        }
    })?;

    tracing::info!(account_id = %account.id, code = %account.code, "fund account created");

    Ok(account)
}

/// Get a fund account by ID.
pub async fn get_account(pool: &DbPool, account_id: Uuid) -> Result<FundAccount, AppError> {
    sqlx::query_as::<_, FundAccount>("SELECT * FROM fund_accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::AccountNotFound)
}

/// List all fund accounts, newest first.
pub async fn list_accounts(pool: &DbPool) -> Result<Vec<FundAccount>, AppError> {
    let accounts =
        sqlx::query_as::<_, FundAccount>("SELECT * FROM fund_accounts ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(accounts)
}

/// Apply a signed delta to an account balance.
///
/// Takes a `&mut PgConnection` rather than the pool on purpose: the
/// caller must already hold an open database transaction tied to the
/// ledger event that justifies the delta. There is no "set balance"
/// operation anywhere in the service.
///
/// # Errors
///
/// - `AccountNotFound`: no row matched the id
pub async fn adjust_balance(
    conn: &mut PgConnection,
    account_id: Uuid,
    delta_cents: i64,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE fund_accounts
        SET current_balance_cents = current_balance_cents + $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(delta_cents)
    .bind(account_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::AccountNotFound);
    }

    Ok(())
}

/// Recompute an account's balance from ledger history and compare it to
/// the recorded balance.
///
/// The computed value is `initial_balance + Σ signed contribution` over
/// every transaction currently attributed to the account, using live
/// field values. A mismatch means the balance invariant has been broken.
pub async fn audit_balance(pool: &DbPool, account_id: Uuid) -> Result<BalanceAudit, AppError> {
    let account = get_account(pool, account_id).await?;

    let ledger_sum: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN transaction_type = 'Collection' THEN amount_cents
                 ELSE -amount_cents
            END
        ), 0)::BIGINT
        FROM transactions
        WHERE fund_account_id = $1
        "#,
    )
    .bind(account_id)
    .fetch_one(pool)
    .await?;

    let computed = account.initial_balance_cents + ledger_sum;

    Ok(BalanceAudit {
        account_id,
        recorded_balance_cents: account.current_balance_cents,
        computed_balance_cents: computed,
        consistent: computed == account.current_balance_cents,
    })
}

//! Transaction ledger - Core business logic for ledger writes.
//!
//! This service handles:
//! - Transaction creation with its balance adjustment
//! - The field patch applied by override approval, with balance
//!   reversal and reapplication
//! - Lookup and listing
//!
//! # Atomicity Guarantees
//!
//! Every ledger write and its balance effect happen within one
//! PostgreSQL transaction. The check-then-act on the account balance
//! holds a `FOR UPDATE` row lock from the check through the write, so
//! two concurrent disbursements cannot both pass the sufficient-funds
//! check against the same balance.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        override_request::TransactionChanges,
        transaction::{CreateTransactionRequest, Transaction, TransactionType},
    },
    services::fund_account_service,
};

/// Account row as seen under a `FOR UPDATE` lock.
#[derive(Debug, sqlx::FromRow)]
struct LockedAccount {
    current_balance_cents: i64,
    is_active: bool,
}

/// Lock a fund account row for the remainder of the enclosing database
/// transaction.
async fn lock_account(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Option<LockedAccount>, AppError> {
    let row = sqlx::query_as::<_, LockedAccount>(
        "SELECT current_balance_cents, is_active FROM fund_accounts WHERE id = $1 FOR UPDATE",
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Create a ledger transaction.
///
/// # Process
///
/// 1. Validate type, amount, and required text fields
/// 2. Start database transaction
/// 3. If a fund account is referenced: lock it, require it active, and
///    for a Disburse require sufficient balance
/// 4. Insert the ledger row
/// 5. Apply the signed contribution to the account balance
/// 6. Commit (or roll back on any error)
///
/// # Errors
///
/// - `InvalidRequest`: bad type, non-positive amount, missing fields
/// - `AccountNotFound` / `InactiveAccount`: bad fund account reference
/// - `InsufficientFunds`: Disburse exceeds the available balance
/// - `Database`: database error occurred
pub async fn create_transaction(
    pool: &DbPool,
    request: &CreateTransactionRequest,
    created_by: Uuid,
) -> Result<Transaction, AppError> {
    let transaction_type =
        TransactionType::parse(request.transaction_type.trim()).ok_or_else(|| {
            AppError::InvalidRequest(
                "Invalid transaction type. Must be 'Disburse' or 'Collection'".to_string(),
            )
        })?;

    let amount_cents = request.amount.to_cents().ok_or_else(|| {
        AppError::InvalidRequest("Amount must be a number with at most two decimal places".to_string())
    })?;
    if amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be greater than 0".to_string(),
        ));
    }

    let description = request.description.trim();
    let recipient = request.recipient.trim();
    let department = request.department.trim();
    let category = request.category.trim();
    let mode_of_payment = request.mode_of_payment.trim();
    if description.is_empty()
        || recipient.is_empty()
        || department.is_empty()
        || category.is_empty()
        || mode_of_payment.is_empty()
    {
        return Err(AppError::InvalidRequest(
            "Unable to create transaction. Data is incomplete".to_string(),
        ));
    }

    // Start db transaction
    let mut tx = pool.begin().await?;

    // Check-then-act on the balance happens under this row lock
    if let Some(account_id) = request.fund_account_id {
        let account = lock_account(&mut tx, account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;
        if !account.is_active {
            tx.rollback().await?;
            return Err(AppError::InactiveAccount);
        }
        if transaction_type == TransactionType::Disburse
            && account.current_balance_cents < amount_cents
        {
            tx.rollback().await?;
            return Err(AppError::InsufficientFunds {
                available_cents: account.current_balance_cents,
            });
        }
    }

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            transaction_type,
            amount_cents,
            description,
            recipient,
            department,
            category,
            reference,
            mode_of_payment,
            fund_account_id,
            created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(transaction_type.as_str())
    .bind(amount_cents)
    .bind(description)
    .bind(recipient)
    .bind(department)
    .bind(category)
    .bind(request.reference.as_deref().map(str::trim))
    .bind(mode_of_payment)
    .bind(request.fund_account_id)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(account_id) = request.fund_account_id {
        fund_account_service::adjust_balance(
            &mut tx,
            account_id,
            transaction_type.signed_contribution(amount_cents),
        )
        .await?;
    }

    // Commit ledger row and balance delta atomically
    tx.commit().await?;

    tracing::info!(
        transaction_id = %transaction.id,
        transaction_type = transaction_type.as_str(),
        amount_cents,
        "transaction recorded"
    );

    Ok(transaction)
}

/// Get transaction by ID.
pub async fn get_transaction_by_id(
    pool: &DbPool,
    transaction_id: Uuid,
) -> Result<Option<Transaction>, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;

    Ok(transaction)
}

/// List transactions, newest first, optionally filtered by fund account.
pub async fn list_transactions(
    pool: &DbPool,
    fund_account_id: Option<Uuid>,
) -> Result<Vec<Transaction>, AppError> {
    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE ($1::uuid IS NULL OR fund_account_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(fund_account_id)
    .fetch_all(pool)
    .await?;

    Ok(transactions)
}

/// The balance effects of applying a change set to a transaction.
///
/// Produced by [`plan_patch`], consumed by [`apply_changes`]. Deltas for
/// the same account are netted, and zero deltas are dropped, so the list
/// holds at most two entries: one per distinct account touched.
#[derive(Debug, PartialEq)]
pub struct PatchPlan {
    /// Amount after the patch (unchanged fields keep their value)
    pub new_amount_cents: i64,

    /// Fund account after the patch
    pub new_fund_account_id: Option<Uuid>,

    /// Signed balance deltas, one per account
    pub deltas: Vec<(Uuid, i64)>,
}

fn push_delta(deltas: &mut Vec<(Uuid, i64)>, account_id: Uuid, delta: i64) {
    if let Some(entry) = deltas.iter_mut().find(|(id, _)| *id == account_id) {
        entry.1 += delta;
    } else {
        deltas.push((account_id, delta));
    }
}

/// Compute the patch a change set implies for a transaction.
///
/// The old contribution is reversed on the old account and the new
/// contribution applied on the (possibly different) new account. A
/// change set that leaves amount and account untouched produces no
/// deltas at all. Pure function; the database work happens in
/// [`apply_changes`].
pub fn plan_patch(
    current: &Transaction,
    changes: &TransactionChanges,
) -> Result<PatchPlan, AppError> {
    let transaction_type = TransactionType::parse(&current.transaction_type).ok_or_else(|| {
        AppError::InvalidRequest("Ledger row has an unknown transaction type".to_string())
    })?;

    let new_amount_cents = changes.amount_cents.unwrap_or(current.amount_cents);
    if new_amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be greater than 0".to_string(),
        ));
    }

    let new_fund_account_id = changes.fund_account_id.or(current.fund_account_id);

    let mut deltas = Vec::new();
    if let Some(old_account) = current.fund_account_id {
        push_delta(
            &mut deltas,
            old_account,
            -transaction_type.signed_contribution(current.amount_cents),
        );
    }
    if let Some(new_account) = new_fund_account_id {
        push_delta(
            &mut deltas,
            new_account,
            transaction_type.signed_contribution(new_amount_cents),
        );
    }
    deltas.retain(|(_, delta)| *delta != 0);

    Ok(PatchPlan {
        new_amount_cents,
        new_fund_account_id,
        deltas,
    })
}

/// Apply an approved change set to a transaction.
///
/// Used exclusively by the override approval path; there is no general
/// update API for ledger rows. Runs entirely on the caller's open
/// database transaction so the patch, the balance deltas, and the
/// override status transition commit or roll back as one unit.
///
/// Re-runs the create-path validation before touching anything: a
/// reassignment target must exist and be active, and no account may end
/// up with a negative balance after its delta. A failure here aborts the
/// whole approval, leaving the request pending.
pub async fn apply_changes(
    conn: &mut PgConnection,
    current: &Transaction,
    changes: &TransactionChanges,
) -> Result<Transaction, AppError> {
    let plan = plan_patch(current, changes)?;

    let reassigned = changes.fund_account_id.is_some()
        && changes.fund_account_id != current.fund_account_id;

    // Lock in sorted order so two approvals touching the same pair of
    // accounts cannot deadlock. A reassignment target always appears
    // here: its delta is the new contribution, which is never zero.
    let mut involved: Vec<Uuid> = plan.deltas.iter().map(|(id, _)| *id).collect();
    involved.sort();

    for account_id in &involved {
        let account = lock_account(&mut *conn, *account_id)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if reassigned && Some(*account_id) == plan.new_fund_account_id && !account.is_active {
            return Err(AppError::InactiveAccount);
        }

        if let Some((_, delta)) = plan.deltas.iter().find(|(id, _)| id == account_id) {
            if account.current_balance_cents + delta < 0 {
                return Err(AppError::InsufficientFunds {
                    available_cents: account.current_balance_cents,
                });
            }
        }
    }

    // Static column list: the whitelist is fixed, so the SQL is too.
    // Unchanged fields are rewritten with their current values.
    let updated = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET amount_cents = $2,
            description = $3,
            recipient = $4,
            department = $5,
            category = $6,
            reference = $7,
            mode_of_payment = $8,
            fund_account_id = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(current.id)
    .bind(plan.new_amount_cents)
    .bind(changes.description.as_deref().unwrap_or(&current.description))
    .bind(changes.recipient.as_deref().unwrap_or(&current.recipient))
    .bind(changes.department.as_deref().unwrap_or(&current.department))
    .bind(changes.category.as_deref().unwrap_or(&current.category))
    .bind(
        changes
            .reference
            .as_deref()
            .or(current.reference.as_deref()),
    )
    .bind(
        changes
            .mode_of_payment
            .as_deref()
            .unwrap_or(&current.mode_of_payment),
    )
    .bind(plan.new_fund_account_id)
    .fetch_one(&mut *conn)
    .await?;

    for (account_id, delta) in &plan.deltas {
        fund_account_service::adjust_balance(&mut *conn, *account_id, *delta).await?;
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn disburse(amount_cents: i64, fund_account_id: Option<Uuid>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            transaction_type: "Disburse".to_string(),
            amount_cents,
            description: "Office supplies".to_string(),
            recipient: "Acme Supplies Inc".to_string(),
            department: "Administration".to_string(),
            category: "Supplies".to_string(),
            reference: None,
            mode_of_payment: "Check".to_string(),
            fund_account_id,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amount_change_nets_into_a_single_delta() {
        // Disburse 40.00 corrected to 25.00: reverse -40.00, apply -25.00,
        // net +15.00 on the same account
        let account = Uuid::new_v4();
        let current = disburse(4000, Some(account));
        let changes = TransactionChanges {
            amount_cents: Some(2500),
            ..Default::default()
        };

        let plan = plan_patch(&current, &changes).unwrap();
        assert_eq!(plan.new_amount_cents, 2500);
        assert_eq!(plan.new_fund_account_id, Some(account));
        assert_eq!(plan.deltas, vec![(account, 1500)]);
    }

    #[test]
    fn account_reassignment_reverses_old_and_applies_new() {
        let old_account = Uuid::new_v4();
        let new_account = Uuid::new_v4();
        let current = disburse(4000, Some(old_account));
        let changes = TransactionChanges {
            fund_account_id: Some(new_account),
            ..Default::default()
        };

        let plan = plan_patch(&current, &changes).unwrap();
        assert_eq!(plan.new_fund_account_id, Some(new_account));
        assert!(plan.deltas.contains(&(old_account, 4000)));
        assert!(plan.deltas.contains(&(new_account, -4000)));
    }

    #[test]
    fn reassignment_and_amount_change_combine() {
        let old_account = Uuid::new_v4();
        let new_account = Uuid::new_v4();
        let current = disburse(4000, Some(old_account));
        let changes = TransactionChanges {
            amount_cents: Some(1000),
            fund_account_id: Some(new_account),
            ..Default::default()
        };

        let plan = plan_patch(&current, &changes).unwrap();
        assert!(plan.deltas.contains(&(old_account, 4000)));
        assert!(plan.deltas.contains(&(new_account, -1000)));
    }

    #[test]
    fn collection_contributions_have_the_opposite_sign() {
        let account = Uuid::new_v4();
        let mut current = disburse(4000, Some(account));
        current.transaction_type = "Collection".to_string();
        let changes = TransactionChanges {
            amount_cents: Some(2500),
            ..Default::default()
        };

        // Collection 40.00 corrected to 25.00: net -15.00
        let plan = plan_patch(&current, &changes).unwrap();
        assert_eq!(plan.deltas, vec![(account, -1500)]);
    }

    #[test]
    fn text_only_changes_produce_no_deltas() {
        let current = disburse(4000, Some(Uuid::new_v4()));
        let changes = TransactionChanges {
            description: Some("Corrected description".to_string()),
            ..Default::default()
        };

        let plan = plan_patch(&current, &changes).unwrap();
        assert!(plan.deltas.is_empty());
        assert_eq!(plan.new_amount_cents, 4000);
    }

    #[test]
    fn unchanged_amount_on_unlinked_transaction_is_a_noop_plan() {
        let current = disburse(4000, None);
        let changes = TransactionChanges {
            amount_cents: Some(2500),
            ..Default::default()
        };

        // No fund account: amount changes but nothing posts anywhere
        let plan = plan_patch(&current, &changes).unwrap();
        assert!(plan.deltas.is_empty());
        assert_eq!(plan.new_amount_cents, 2500);
    }

    #[test]
    fn zero_amount_patch_is_rejected() {
        let current = disburse(4000, Some(Uuid::new_v4()));
        let changes = TransactionChanges {
            amount_cents: Some(0),
            ..Default::default()
        };

        assert!(matches!(
            plan_patch(&current, &changes),
            Err(AppError::InvalidRequest(_))
        ));
    }
}

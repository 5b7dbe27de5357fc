//! End-to-end workflow tests against a real PostgreSQL database.
//!
//! These tests exercise the full create/propose/review cycle, including
//! the concurrent-review race. They are `#[ignore]`d by default; run them
//! with a database available:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```

use serde_json::json;
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        fund_account::FundAccount,
        money::parse_amount_cents,
        transaction::{CreateTransactionRequest, Transaction},
    },
    services::{
        fund_account_service,
        override_service::{self, ReviewDecision},
        transaction_service,
    },
};

async fn test_pool() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for workflow tests");
    let pool = db::create_pool(&url).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrate");
    pool
}

async fn seed_user(pool: &DbPool, role: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("{role} {}", Uuid::new_v4()))
    .bind(format!("{}@example.gov", Uuid::new_v4()))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("seed user")
}

fn admin_context(user_id: Uuid) -> AuthContext {
    AuthContext {
        user_id,
        role: "Admin".to_string(),
    }
}

async fn seed_account(pool: &DbPool, created_by: Uuid, initial: &str) -> FundAccount {
    fund_account_service::create_account(
        pool,
        "General Fund",
        &format!("GF-{}", Uuid::new_v4()),
        "Revenue",
        Some("Treasury".to_string()),
        None,
        parse_amount_cents(initial).unwrap(),
        created_by,
    )
    .await
    .expect("seed account")
}

fn disburse_request(amount: &str, fund_account_id: Option<Uuid>) -> CreateTransactionRequest {
    serde_json::from_value(json!({
        "type": "Disburse",
        "amount": amount,
        "description": "Office supplies",
        "recipient": "Acme Supplies Inc",
        "department": "Administration",
        "category": "Supplies",
        "mode_of_payment": "Check",
        "fund_account_id": fund_account_id,
    }))
    .unwrap()
}

async fn fetch_transaction(pool: &DbPool, id: Uuid) -> Transaction {
    transaction_service::get_transaction_by_id(pool, id)
        .await
        .unwrap()
        .unwrap()
}

async fn fetch_balance(pool: &DbPool, id: Uuid) -> i64 {
    fund_account_service::get_account(pool, id)
        .await
        .unwrap()
        .current_balance_cents
}

async fn assert_consistent(pool: &DbPool, account_id: Uuid) {
    let audit = fund_account_service::audit_balance(pool, account_id)
        .await
        .unwrap();
    assert!(
        audit.consistent,
        "balance {} != ledger-derived {}",
        audit.recorded_balance_cents, audit.computed_balance_cents
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn approved_amount_override_reverses_and_reapplies_the_contribution() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin = seed_user(&pool, "Admin").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();
    assert_eq!(fetch_balance(&pool, account.id).await, 6000);

    let request = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Amount was recorded from the wrong invoice",
        &json!({ "amount": "25.00", "evil_field": "x" }),
    )
    .await
    .unwrap();
    assert_eq!(request.status, "pending");
    // The unknown key never made it into storage
    assert_eq!(
        serde_json::to_value(&request.changes.0).unwrap(),
        json!({ "amount_cents": 2500 })
    );
    // Proposing touches nothing
    assert_eq!(fetch_balance(&pool, account.id).await, 6000);

    let outcome = override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Approve,
        Some("Checked against the invoice".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, "approved");
    assert_eq!(outcome.transaction_id, transaction.id);

    let updated = fetch_transaction(&pool, transaction.id).await;
    assert_eq!(updated.amount_cents, 2500);
    assert_eq!(fetch_balance(&pool, account.id).await, 7500);
    assert_consistent(&pool, account.id).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn concurrent_reviews_have_exactly_one_winner() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin_a = seed_user(&pool, "Admin").await;
    let admin_b = seed_user(&pool, "Admin").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();
    let request = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Wrong amount",
        &json!({ "amount": "25.00" }),
    )
    .await
    .unwrap();

    let admin_a_ctx = admin_context(admin_a);
    let admin_b_ctx = admin_context(admin_b);
    let approve = override_service::review(
        &pool,
        request.id,
        &admin_a_ctx,
        ReviewDecision::Approve,
        None,
    );
    let reject = override_service::review(
        &pool,
        request.id,
        &admin_b_ctx,
        ReviewDecision::Reject,
        None,
    );
    let (approve_result, reject_result) = tokio::join!(approve, reject);

    let approve_won = approve_result.is_ok();
    assert_ne!(
        approve_won,
        reject_result.is_ok(),
        "exactly one reviewer must win"
    );

    let loser = if approve_won {
        reject_result.unwrap_err()
    } else {
        approve_result.unwrap_err()
    };
    assert!(matches!(loser, AppError::OverrideAlreadyProcessed));

    // The ledger reflects exactly the winning outcome
    let updated = fetch_transaction(&pool, transaction.id).await;
    let balance = fetch_balance(&pool, account.id).await;
    if approve_won {
        assert_eq!(updated.amount_cents, 2500);
        assert_eq!(balance, 7500);
    } else {
        assert_eq!(updated.amount_cents, 4000);
        assert_eq!(balance, 6000);
    }
    assert_consistent(&pool, account.id).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn rejection_mutates_neither_transaction_nor_account() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin = seed_user(&pool, "Admin").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();
    let before_tx = fetch_transaction(&pool, transaction.id).await;
    let before_balance = fetch_balance(&pool, account.id).await;

    let request = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Wrong amount",
        &json!({ "amount": "25.00" }),
    )
    .await
    .unwrap();
    let outcome = override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Reject,
        Some("Invoice matches the recorded amount".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(outcome.status, "rejected");

    let after_tx = fetch_transaction(&pool, transaction.id).await;
    assert_eq!(after_tx.amount_cents, before_tx.amount_cents);
    assert_eq!(after_tx.fund_account_id, before_tx.fund_account_id);
    assert_eq!(fetch_balance(&pool, account.id).await, before_balance);
    assert_consistent(&pool, account.id).await;

    // Terminal: a second review loses
    let again = override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Approve,
        None,
    )
    .await;
    assert!(matches!(again, Err(AppError::OverrideAlreadyProcessed)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn disbursement_boundary_at_exact_balance() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    // One cent over the balance is rejected and changes nothing
    let over = transaction_service::create_transaction(
        &pool,
        &disburse_request("100.01", Some(account.id)),
        clerk,
    )
    .await;
    match over {
        Err(AppError::InsufficientFunds { available_cents }) => {
            assert_eq!(available_cents, 10_000);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert_eq!(fetch_balance(&pool, account.id).await, 10_000);

    // Exactly the balance drains the account to zero
    transaction_service::create_transaction(
        &pool,
        &disburse_request("100.00", Some(account.id)),
        clerk,
    )
    .await
    .unwrap();
    assert_eq!(fetch_balance(&pool, account.id).await, 0);
    assert_consistent(&pool, account.id).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn approval_that_would_overdraw_fails_and_stays_pending() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin = seed_user(&pool, "Admin").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();

    // Raising the disbursement to 200.00 would leave the balance at -100.00
    let request = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Understated amount",
        &json!({ "amount": "200.00" }),
    )
    .await
    .unwrap();

    let result = override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Approve,
        None,
    )
    .await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

    // The whole approval rolled back: still pending, nothing applied
    let status: String =
        sqlx::query_scalar("SELECT status FROM override_requests WHERE id = $1")
            .bind(request.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "pending");
    assert_eq!(fetch_transaction(&pool, transaction.id).await.amount_cents, 4000);
    assert_eq!(fetch_balance(&pool, account.id).await, 6000);
    assert_consistent(&pool, account.id).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn reassignment_moves_the_contribution_between_accounts() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin = seed_user(&pool, "Admin").await;
    let account_a = seed_account(&pool, clerk, "100.00").await;
    let account_b = seed_account(&pool, clerk, "50.00").await;

    let transaction = transaction_service::create_transaction(
        &pool,
        &disburse_request("40.00", Some(account_a.id)),
        clerk,
    )
    .await
    .unwrap();
    assert_eq!(fetch_balance(&pool, account_a.id).await, 6000);

    let request = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Charged to the wrong fund",
        &json!({ "fund_account_id": account_b.id.to_string() }),
    )
    .await
    .unwrap();
    override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Approve,
        None,
    )
    .await
    .unwrap();

    // The debit left A and landed on B
    assert_eq!(fetch_balance(&pool, account_a.id).await, 10_000);
    assert_eq!(fetch_balance(&pool, account_b.id).await, 1000);
    assert_eq!(
        fetch_transaction(&pool, transaction.id).await.fund_account_id,
        Some(account_b.id)
    );
    assert_consistent(&pool, account_a.id).await;
    assert_consistent(&pool, account_b.id).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn review_is_gated_to_admins_other_than_the_requester() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let admin = seed_user(&pool, "Admin").await;
    let account = seed_account(&pool, clerk, "100.00").await;

    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();
    let request = override_service::propose(
        &pool,
        transaction.id,
        admin,
        "Wrong amount",
        &json!({ "amount": "25.00" }),
    )
    .await
    .unwrap();

    // Non-admin cannot review
    let as_clerk = AuthContext {
        user_id: clerk,
        role: "Cashier".to_string(),
    };
    let result =
        override_service::review(&pool, request.id, &as_clerk, ReviewDecision::Approve, None).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // The requester cannot review their own request, even as an admin
    let result = override_service::review(
        &pool,
        request.id,
        &admin_context(admin),
        ReviewDecision::Approve,
        None,
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Both refusals left the request pending
    let status: String =
        sqlx::query_scalar("SELECT status FROM override_requests WHERE id = $1")
            .bind(request.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "pending");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn propose_validates_its_references() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let account = seed_account(&pool, clerk, "100.00").await;
    let transaction =
        transaction_service::create_transaction(&pool, &disburse_request("40.00", Some(account.id)), clerk)
            .await
            .unwrap();

    let missing_tx = override_service::propose(
        &pool,
        Uuid::new_v4(),
        clerk,
        "Wrong amount",
        &json!({ "amount": "25.00" }),
    )
    .await;
    assert!(matches!(missing_tx, Err(AppError::TransactionNotFound)));

    let missing_user = override_service::propose(
        &pool,
        transaction.id,
        Uuid::new_v4(),
        "Wrong amount",
        &json!({ "amount": "25.00" }),
    )
    .await;
    assert!(matches!(missing_user, Err(AppError::UserNotFound)));

    let empty_reason = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "   ",
        &json!({ "amount": "25.00" }),
    )
    .await;
    assert!(matches!(empty_reason, Err(AppError::InvalidRequest(_))));

    let unknown_account = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "Wrong fund",
        &json!({ "fund_account_id": Uuid::new_v4().to_string() }),
    )
    .await;
    assert!(matches!(unknown_account, Err(AppError::InvalidRequest(_))));

    let nothing_overridable = override_service::propose(
        &pool,
        transaction.id,
        clerk,
        "No-op",
        &json!({ "evil_field": "x" }),
    )
    .await;
    assert!(matches!(nothing_overridable, Err(AppError::InvalidRequest(_))));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn duplicate_fund_codes_are_rejected() {
    let pool = test_pool().await;
    let clerk = seed_user(&pool, "Cashier").await;
    let code = format!("GF-{}", Uuid::new_v4());

    fund_account_service::create_account(
        &pool, "General Fund", &code, "Revenue", None, None, 0, clerk,
    )
    .await
    .unwrap();

    let duplicate = fund_account_service::create_account(
        &pool, "Shadow Fund", &code, "Revenue", None, None, 0, clerk,
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::DuplicateCode)));
}

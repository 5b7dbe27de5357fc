//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Database entity representing a ledger transaction
//! - `TransactionType`: Disburse or Collection, with its signed balance effect
//! - Request and response types for the transaction endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::money::RawAmount;

/// Direction of a ledger transaction.
///
/// Determines the signed contribution a transaction makes to its fund
/// account's balance: a Collection adds the amount, a Disburse subtracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Disburse,
    Collection,
}

impl TransactionType {
    /// Parse a request-supplied type, returning `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Disburse" => Some(Self::Disburse),
            "Collection" => Some(Self::Collection),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disburse => "Disburse",
            Self::Collection => "Collection",
        }
    }

    /// Signed effect of a transaction of this type on its account balance.
    pub fn signed_contribution(&self, amount_cents: i64) -> i64 {
        match self {
            Self::Collection => amount_cents,
            Self::Disburse => -amount_cents,
        }
    }
}

/// Represents a transaction record from the database.
///
/// Maps to the `transactions` table. Rows are immutable after creation
/// with one exception: an approved override request may rewrite the
/// whitelisted fields (amount, description, recipient, department,
/// category, reference, fund_account_id, mode_of_payment). Any rewrite
/// that touches `amount_cents` or `fund_account_id` reverses the old
/// balance contribution and applies the new one in the same database
/// transaction.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// "Disburse" or "Collection"
    pub transaction_type: String,

    /// Amount in cents, always positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    /// What the money was for
    pub description: String,

    /// Payee or payer
    pub recipient: String,

    /// Department the transaction belongs to
    pub department: String,

    /// Budget category
    pub category: String,

    /// Optional external reference number
    pub reference: Option<String>,

    /// How the money moved (cash, check, bank transfer, ...)
    pub mode_of_payment: String,

    /// Fund account this transaction posts against, if any
    ///
    /// NULL transactions are recorded in the ledger but do not affect
    /// any balance.
    pub fund_account_id: Option<Uuid>,

    /// User who recorded the transaction
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "type": "Disburse",
///   "amount": "40.00",
///   "description": "Office supplies",
///   "recipient": "Acme Supplies Inc",
///   "department": "Administration",
///   "category": "Supplies",
///   "reference": "PO-2025-114",
///   "mode_of_payment": "Check",
///   "fund_account_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// # Validation
///
/// - `type` must be "Disburse" or "Collection"
/// - `amount` must be positive with at most two decimal places
/// - `description`, `recipient`, `department`, `category` and
///   `mode_of_payment` must be non-empty
/// - if `fund_account_id` is set, the account must exist and be active,
///   and a Disburse must not exceed its current balance
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub transaction_type: String,

    pub amount: RawAmount,

    pub description: String,

    pub recipient: String,

    pub department: String,

    pub category: String,

    pub reference: Option<String>,

    pub mode_of_payment: String,

    pub fund_account_id: Option<Uuid>,
}

/// Response returned for transaction operations.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount_cents: i64,
    pub description: String,
    pub recipient: String,
    pub department: String,
    pub category: String,
    pub reference: Option<String>,
    pub mode_of_payment: String,
    pub fund_account_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            transaction_type: transaction.transaction_type,
            amount_cents: transaction.amount_cents,
            description: transaction.description,
            recipient: transaction.recipient,
            department: transaction.department,
            category: transaction.category,
            reference: transaction.reference,
            mode_of_payment: transaction.mode_of_payment,
            fund_account_id: transaction.fund_account_id,
            created_by: transaction.created_by,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_recognized_types() {
        assert_eq!(
            TransactionType::parse("Disburse"),
            Some(TransactionType::Disburse)
        );
        assert_eq!(
            TransactionType::parse("Collection"),
            Some(TransactionType::Collection)
        );
        assert_eq!(TransactionType::parse("Transfer"), None);
        assert_eq!(TransactionType::parse("disburse"), None);
    }

    #[test]
    fn collection_adds_and_disburse_subtracts() {
        assert_eq!(TransactionType::Collection.signed_contribution(4000), 4000);
        assert_eq!(TransactionType::Disburse.signed_contribution(4000), -4000);
    }
}

//! Fund account data models and API request/response types.
//!
//! This module defines:
//! - `FundAccount`: Database entity representing a government fund account
//! - `AccountType`: The five recognized account classifications
//! - `CreateFundAccountRequest`: Request body for creating accounts
//! - `FundAccountResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::money::RawAmount;

/// Account classification for a fund account.
///
/// Stored as TEXT in the database (with a CHECK constraint) and validated
/// in code through [`AccountType::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Revenue,
    Expense,
    Asset,
    Liability,
    Equity,
}

impl AccountType {
    /// Parse a request-supplied account type, returning `None` for
    /// anything outside the recognized set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Revenue" => Some(Self::Revenue),
            "Expense" => Some(Self::Expense),
            "Asset" => Some(Self::Asset),
            "Liability" => Some(Self::Liability),
            "Equity" => Some(Self::Equity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Expense => "Expense",
            Self::Asset => "Asset",
            Self::Liability => "Liability",
            Self::Equity => "Equity",
        }
    }
}

/// Represents a fund account record from the database.
///
/// # Balance Invariant
///
/// `current_balance_cents` always equals `initial_balance_cents` plus the
/// signed sum of every transaction currently attributed to this account
/// (Collection adds, Disburse subtracts), using each transaction's live,
/// possibly overridden field values. The only writers are transaction
/// creation and override approval, and both mutate the balance via atomic
/// deltas inside the same database transaction as the ledger write.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FundAccount {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Human-assigned unique fund code
    pub code: String,

    /// Human-readable account name
    pub name: String,

    /// One of: Revenue, Expense, Asset, Liability, Equity
    pub account_type: String,

    /// Owning department, if any
    pub department: Option<String>,

    /// Free-text description
    pub description: Option<String>,

    /// Balance at creation time, in cents (never negative)
    pub initial_balance_cents: i64,

    /// Live balance in cents (signed)
    pub current_balance_cents: i64,

    /// Inactive accounts cannot receive new transactions
    ///
    /// Deactivation is the only retirement mechanism; accounts are never
    /// deleted.
    pub is_active: bool,

    /// User who created the account
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a new fund account.
///
/// # JSON Example
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
#[derive(Debug, Deserialize)]
pub struct CreateFundAccountRequest {
    /// Account name
    pub name: String,

    /// Unique fund code
    pub code: String,

    /// Must be one of the five recognized account types
    pub account_type: String,

    /// Optional owning department
    pub department: Option<String>,

    /// Optional free-text description
    pub description: Option<String>,

    /// Opening balance; defaults to 0 and must not be negative
    pub initial_balance: Option<RawAmount>,
}

/// Response body for fund account endpoints.
#[derive(Debug, Serialize)]
pub struct FundAccountResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: String,
    pub department: Option<String>,
    pub description: Option<String>,
    pub initial_balance_cents: i64,
    pub current_balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database FundAccount to API FundAccountResponse.
///
/// Drops the internal `created_by` reference.
impl From<FundAccount> for FundAccountResponse {
    fn from(account: FundAccount) -> Self {
        Self {
            id: account.id,
            code: account.code,
            name: account.name,
            account_type: account.account_type,
            department: account.department,
            description: account.description,
            initial_balance_cents: account.initial_balance_cents,
            current_balance_cents: account.current_balance_cents,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Result of auditing an account's balance against its ledger history.
///
/// `computed_balance_cents` is the initial balance plus the signed sum of
/// all transactions currently attributed to the account; `consistent`
/// reports whether it matches the recorded balance.
#[derive(Debug, Serialize)]
pub struct BalanceAudit {
    pub account_id: Uuid,
    pub recorded_balance_cents: i64,
    pub computed_balance_cents: i64,
    pub consistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_recognized_account_types() {
        assert_eq!(AccountType::parse("Revenue"), Some(AccountType::Revenue));
        assert_eq!(AccountType::parse("Equity"), Some(AccountType::Equity));
        assert_eq!(AccountType::parse("revenue"), None);
        assert_eq!(AccountType::parse("Savings"), None);
        assert_eq!(AccountType::parse(""), None);
    }
}

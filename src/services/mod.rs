//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the database-transaction discipline: every multi-row
//! mutation (ledger write + balance delta, or status transition +
//! field patch + balance deltas) commits or rolls back as one unit.

pub mod fund_account_service;
pub mod override_service;
pub mod transaction_service;

#[cfg(test)]
mod workflow_tests;

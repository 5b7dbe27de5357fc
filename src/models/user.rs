//! User model.
//!
//! Registration and login live outside this service; users are referenced
//! here only as the `created_by` / `requested_by` / `reviewed_by` parties
//! of ledger events and override requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a user record from the database.
///
/// Maps to the `users` table. Rows are created out-of-band; this service
/// only reads them to verify that a referenced user exists.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Unique email address
    pub email: String,

    /// Role name: Admin, Cashier, Collecting Officer, or Disbursing Officer
    ///
    /// Only Admin may review override requests.
    pub role: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Role allowed to approve or reject override requests.
pub const REVIEWER_ROLE: &str = "Admin";

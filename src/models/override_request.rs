//! Override request data models and the whitelisted change set.
//!
//! An override request proposes a correction to an already-recorded
//! transaction. It is created in `pending` state, and exactly one review
//! moves it to `approved` (ledger and balance mutated) or `rejected`
//! (nothing mutated). Both outcomes are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::money::parse_amount_cents;

/// Review state of an override request.
///
/// `pending -> approved` and `pending -> rejected` are the only
/// transitions; there is no resubmit or revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStatus {
    Pending,
    Approved,
    Rejected,
}

impl OverrideStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// The whitelisted, typed change set carried by an override request.
///
/// Rather than an open key/value map, the patch is a fixed set of
/// optional fields, so the type system guarantees no unlisted transaction
/// field can even be represented. Proposals are filtered into this struct
/// by [`TransactionChanges::from_raw`], which silently drops unknown keys;
/// approval applies whatever fields are present, so a field that never
/// made it in here can never reach the ledger.
///
/// `None` means "leave the transaction's current value alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fund_account_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_of_payment: Option<String>,
}

/// Text fields that may be overridden, as they appear in request JSON.
const TEXT_FIELDS: [&str; 5] = [
    "description",
    "recipient",
    "department",
    "category",
    "mode_of_payment",
];

impl TransactionChanges {
    /// Filter a raw `changes` object down to the whitelist.
    ///
    /// Unknown keys are dropped without error; only structurally invalid
    /// values are rejected (non-numeric or negative `amount`, malformed
    /// `fund_account_id`, non-string text fields). JSON `null` values and
    /// an empty-string `fund_account_id` are treated as absent.
    pub fn from_raw(raw: &Value) -> Result<Self, String> {
        let obj = raw
            .as_object()
            .ok_or_else(|| "changes must be a JSON object".to_string())?;

        let mut changes = Self::default();

        if let Some(value) = obj.get("amount").filter(|v| !v.is_null()) {
            let cents = match value {
                Value::Number(n) => parse_amount_cents(&n.to_string()),
                Value::String(s) => parse_amount_cents(s),
                _ => None,
            }
            .ok_or_else(|| "Invalid amount value".to_string())?;
            changes.amount_cents = Some(cents);
        }

        for field in TEXT_FIELDS {
            if let Some(value) = obj.get(field).filter(|v| !v.is_null()) {
                let text = value
                    .as_str()
                    .ok_or_else(|| format!("{field} must be a string"))?;
                let text = text.to_string();
                match field {
                    "description" => changes.description = Some(text),
                    "recipient" => changes.recipient = Some(text),
                    "department" => changes.department = Some(text),
                    "category" => changes.category = Some(text),
                    "mode_of_payment" => changes.mode_of_payment = Some(text),
                    _ => unreachable!(),
                }
            }
        }

        // Reference may be cleared by sending an empty string.
        if let Some(value) = obj.get("reference").filter(|v| !v.is_null()) {
            let text = value
                .as_str()
                .ok_or_else(|| "reference must be a string".to_string())?;
            changes.reference = Some(text.to_string());
        }

        if let Some(value) = obj.get("fund_account_id").filter(|v| !v.is_null()) {
            let text = value
                .as_str()
                .ok_or_else(|| "Invalid fund account ID".to_string())?;
            if !text.is_empty() {
                let id = text
                    .parse::<Uuid>()
                    .map_err(|_| "Invalid fund account ID".to_string())?;
                changes.fund_account_id = Some(id);
            }
        }

        Ok(changes)
    }

    /// True when no whitelisted field survived filtering.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Represents an override request record from the database.
///
/// Once `approved` or `rejected` the row is immutable; the `changes`
/// payload is retained as a historical record of what was requested.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OverrideRequest {
    /// Unique identifier for this request
    pub id: Uuid,

    /// Transaction this request proposes to correct
    pub transaction_id: Uuid,

    /// User who filed the request
    pub requested_by: Uuid,

    /// Why the correction is needed (required)
    pub reason: String,

    /// Whitelisted change set, stored as JSONB
    pub changes: sqlx::types::Json<TransactionChanges>,

    /// "pending", "approved", or "rejected"
    pub status: String,

    /// Reviewer who decided the request, once decided
    pub reviewed_by: Option<Uuid>,

    /// Reviewer's notes, if any
    pub review_notes: Option<String>,

    pub created_at: DateTime<Utc>,

    /// When the request was approved or rejected
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Request body for proposing an override.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_id": "770e8400-e29b-41d4-a716-446655440002",
///   "reason": "Amount was recorded from the wrong invoice",
///   "changes": { "amount": "25.00" }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProposeOverrideRequest {
    pub transaction_id: Uuid,

    pub reason: String,

    /// Raw change map; filtered to the whitelist before storage
    pub changes: Value,
}

/// Optional body for approve/reject endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewOverrideRequest {
    pub review_notes: Option<String>,
}

/// Result of a review decision, returned to the caller.
#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub override_id: Uuid,
    pub transaction_id: Uuid,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_silently_dropped() {
        let raw = json!({ "amount": 50, "evil_field": "x" });
        let changes = TransactionChanges::from_raw(&raw).unwrap();
        assert_eq!(changes.amount_cents, Some(5000));
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({ "amount_cents": 5000 })
        );
    }

    #[test]
    fn amount_accepts_number_or_string() {
        let changes = TransactionChanges::from_raw(&json!({ "amount": "25.00" })).unwrap();
        assert_eq!(changes.amount_cents, Some(2500));

        let changes = TransactionChanges::from_raw(&json!({ "amount": 25 })).unwrap();
        assert_eq!(changes.amount_cents, Some(2500));
    }

    #[test]
    fn non_numeric_or_negative_amount_is_rejected() {
        assert!(TransactionChanges::from_raw(&json!({ "amount": "abc" })).is_err());
        assert!(TransactionChanges::from_raw(&json!({ "amount": -5 })).is_err());
        assert!(TransactionChanges::from_raw(&json!({ "amount": true })).is_err());
    }

    #[test]
    fn empty_fund_account_id_is_dropped() {
        let changes = TransactionChanges::from_raw(&json!({ "fund_account_id": "" })).unwrap();
        assert_eq!(changes.fund_account_id, None);
        assert!(changes.is_empty());
    }

    #[test]
    fn malformed_fund_account_id_is_rejected() {
        assert!(TransactionChanges::from_raw(&json!({ "fund_account_id": "not-a-uuid" })).is_err());
    }

    #[test]
    fn non_object_changes_are_rejected() {
        assert!(TransactionChanges::from_raw(&json!("amount=50")).is_err());
        assert!(TransactionChanges::from_raw(&json!(null)).is_err());
    }

    #[test]
    fn text_fields_must_be_strings() {
        assert!(TransactionChanges::from_raw(&json!({ "description": 7 })).is_err());
        let changes =
            TransactionChanges::from_raw(&json!({ "description": "corrected" })).unwrap();
        assert_eq!(changes.description.as_deref(), Some("corrected"));
    }

    #[test]
    fn round_trips_through_json() {
        let raw = json!({
            "amount": "12.34",
            "recipient": "City Treasurer",
            "reference": ""
        });
        let changes = TransactionChanges::from_raw(&raw).unwrap();
        let stored = serde_json::to_string(&changes).unwrap();
        let back: TransactionChanges = serde_json::from_str(&stored).unwrap();
        assert_eq!(back, changes);
        assert_eq!(back.reference.as_deref(), Some(""));
    }
}

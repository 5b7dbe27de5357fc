//! Money parsing and formatting helpers.
//!
//! Amounts are stored everywhere as `i64` cents, never floats. The API
//! accepts amounts as JSON numbers or decimal strings with at most two
//! fraction digits; parsing goes straight from the textual form to cents
//! without any floating-point arithmetic.

use serde::Deserialize;

/// An amount as it arrives in a JSON request body.
///
/// Clients send either `"amount": 40.00` or `"amount": "40.00"`; both
/// forms are accepted and converted to cents with [`RawAmount::to_cents`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl RawAmount {
    /// Convert to cents, rejecting malformed or negative values.
    pub fn to_cents(&self) -> Option<i64> {
        match self {
            RawAmount::Number(n) => parse_amount_cents(&n.to_string()),
            RawAmount::Text(s) => parse_amount_cents(s),
        }
    }
}

/// Parse a non-negative decimal string ("40", "40.5", "40.00") into cents.
///
/// Returns `None` for anything else: negative values, more than two
/// fraction digits, exponents, currency symbols, thousands separators.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac_part.len() > 2 || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let frac: i64 = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>().ok()? * 10,
        _ => frac_part.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(frac)
}

/// Format cents as a decimal string with two fraction digits ("123.45").
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

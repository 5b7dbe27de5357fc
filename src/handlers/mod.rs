//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the service layer
//! 3. Returns HTTP response (JSON, status code)

/// Fund account endpoints
pub mod fund_accounts;
/// Health check endpoint
pub mod health;
/// Override request endpoints
pub mod overrides;
/// Transaction ledger endpoints
pub mod transactions;

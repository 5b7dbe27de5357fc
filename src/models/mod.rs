//! Data models: database entities and API request/response types.

pub mod fund_account;
pub mod money;
pub mod override_request;
pub mod transaction;
pub mod user;

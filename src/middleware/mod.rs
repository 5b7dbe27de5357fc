//! HTTP middleware.
//!
//! Middleware functions run before route handlers and can:
//! - Authenticate requests
//! - Modify requests (add extensions)
//! - Reject requests early

/// Bearer token authentication
pub mod auth;

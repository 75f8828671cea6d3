//! HTTP middleware components.
//!
//! Middleware are functions that run around route handlers.
//! They can:
//! - Authenticate requests
//! - Rewrite error responses
//! - Short-circuit requests (reject unauthorized)

/// Bearer token authentication middleware
pub mod auth;
/// Internal error detail for development builds
pub mod error_details;

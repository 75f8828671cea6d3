//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, the caller's identity)
//! 2. Delegates to a service with the current time
//! 3. Returns a JSON response
//!
//! Every handler except the health check runs behind the auth middleware and
//! reads the caller from `Extension<AuthContext>`.

use serde::Serialize;

/// Balance read and overwrite
pub mod balance;
/// Budget upsert, list and delete
pub mod budgets;
/// Expense CRUD
pub mod expenses;
/// Liveness probe
pub mod health;
/// Profile read and merge
pub mod profile;
/// Recurring templates and their materialization
pub mod recurring;
/// Spending statistics and budget alerts
pub mod stats;

/// Body of responses that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

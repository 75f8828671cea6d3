//! Expense Ledger - personal finance REST API.
//!
//! Each authenticated user owns a ledger: a profile, a cash/online balance,
//! expenses, per-category budgets and recurring-expense templates. Expense
//! writes move the balance atomically, budgets are unique per category and
//! period, and recurring templates are fired by a background worker as well
//! as on demand.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: PostgreSQL with sqlx, or an in-memory store
//! - **Authentication**: bearer JWTs from an external identity provider
//! - **Format**: JSON requests/responses with camelCase keys

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod store;

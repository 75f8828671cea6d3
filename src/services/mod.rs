//! Business logic services.
//!
//! Services contain the ledger rules separated from HTTP handlers. Each one
//! takes the store as `&dyn LedgerStore`, the verified user id, and the
//! current time, so tests can drive them with the in-memory store and a
//! fixed clock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppError,
    models::{
        expense::{MAX_EXPENSE_AMOUNT, PaymentType},
        parse_timestamp,
    },
};

pub mod analytics_service;
pub mod balance_service;
pub mod budget_service;
pub mod expense_service;
pub mod profile_service;
pub mod recurring_service;

/// Treat empty and whitespace-only strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Amount bounds shared by expenses and recurring templates.
pub(crate) fn check_amount(amount: Decimal) -> Result<Decimal, AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::validation("Amount cannot be negative"));
    }
    if amount > MAX_EXPENSE_AMOUNT {
        return Err(AppError::validation("Amount cannot exceed 10,000"));
    }
    Ok(amount)
}

pub(crate) fn parse_payment_type(value: &str) -> Result<PaymentType, AppError> {
    value
        .parse()
        .map_err(|_| AppError::validation("Type must be cash or online"))
}

/// Parse an optional timestamp field; blank counts as absent.
pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
    field: &str,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw.trim(), end_of_day)
            .map(Some)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Invalid {field}: expected an RFC 3339 timestamp or YYYY-MM-DD"
                ))
            }),
    }
}

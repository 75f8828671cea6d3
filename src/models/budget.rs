//! Budget data models.
//!
//! A budget caps spending in one category over a repeating period. The pair
//! `(category, period)` is the natural key: a user has at most one budget
//! per pair.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ParseEnumError, start_of_day, start_of_month};

/// Window a budget limit is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "daily",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
        }
    }

    /// First instant of the current window.
    ///
    /// - daily: midnight UTC today
    /// - weekly: seven days before `now` (a rolling window, not a calendar week)
    /// - monthly: midnight UTC on the first of the month
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BudgetPeriod::Daily => start_of_day(now),
            BudgetPeriod::Weekly => now - Duration::days(7),
            BudgetPeriod::Monthly => start_of_month(now),
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(BudgetPeriod::Daily),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            other => Err(ParseEnumError::new("budget period", other)),
        }
    }
}

impl TryFrom<String> for BudgetPeriod {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A spending limit for one category and period.
///
/// # Database Table
///
/// Maps to the `budgets` table, unique on `(user_id, category, period)`.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "0b7c1c8e-4f8e-4a57-9d0c-2f3b9a6f1e11",
///   "category": "Food",
///   "limitAmount": 300.0,
///   "period": "monthly",
///   "updatedAt": "2025-01-15T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub category: String,

    /// Always greater than zero
    #[serde(with = "rust_decimal::serde::float")]
    pub limit_amount: Decimal,

    #[sqlx(try_from = "String")]
    pub period: BudgetPeriod,

    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/budgets`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub category: Option<String>,
    pub limit_amount: Option<Decimal>,
    pub period: Option<String>,
}

/// Validated budget contents, ready to be upserted.
#[derive(Debug, Clone)]
pub struct BudgetDraft {
    pub category: String,
    pub limit_amount: Decimal,
    pub period: BudgetPeriod,
}

/// Whether an upsert inserted a new budget or overwrote the existing one
/// for the same `(category, period)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

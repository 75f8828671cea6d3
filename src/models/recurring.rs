//! Recurring-expense templates.
//!
//! A template describes an expense that repeats with a fixed frequency.
//! Its `next_due` timestamp only ever moves forward: each time the template
//! fires, one expense is materialized and `next_due` advances by exactly one
//! frequency unit from its previous value.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    ParseEnumError,
    expense::{Expense, PaymentType},
};

/// Prefix marking an expense as materialized from a template.
pub const RECURRING_DESCRIPTION_PREFIX: &str = "[Recurring] ";

/// How often a template fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Move `from` forward by one unit of this frequency.
    ///
    /// Days and weeks are fixed durations (timestamps are UTC, so there are
    /// no daylight-saving jumps). Months and years are calendar steps that
    /// clamp to the last day of a shorter month: Jan 31 + 1 month is Feb 28
    /// (or 29), and Feb 29 + 1 year is Feb 28. The time of day is kept.
    ///
    /// Each step starts from the previous, already clamped date, so a
    /// schedule anchored on the 31st drifts: Jan 31, Feb 28, Mar 28, Apr 28.
    /// Same for a yearly Feb 29, which stays on Feb 28 after the first year.
    ///
    /// Returns `None` only when the result would leave chrono's range.
    pub fn advance(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => from.checked_add_signed(Duration::days(7)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Yearly => from.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(ParseEnumError::new("frequency", other)),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A recurring-expense template.
///
/// # Database Table
///
/// Maps to the `recurring_expenses` table.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "7d2a4b8e-1c3f-4e5a-9b6d-8f0e2c4a6b1d",
///   "amount": 9.99,
///   "type": "online",
///   "category": "Subscriptions",
///   "description": "music streaming",
///   "frequency": "monthly",
///   "nextDue": "2025-02-15T10:00:00Z",
///   "active": true,
///   "createdAt": "2025-01-15T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    pub id: Uuid,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: PaymentType,

    pub category: String,
    pub description: String,

    #[sqlx(try_from = "String")]
    pub frequency: Frequency,

    /// Next time this template fires
    pub next_due: DateTime<Utc>,

    /// Inactive templates never fire
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl RecurringExpense {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active && self.next_due <= now
    }

    /// The expense produced when this template fires at `now`.
    pub fn materialize(&self, now: DateTime<Utc>) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: self.amount,
            kind: self.kind,
            category: self.category.clone(),
            description: format!("{}{}", RECURRING_DESCRIPTION_PREFIX, self.description),
            date: now,
            created_at: now,
        }
    }
}

/// Request body for `POST /api/recurring`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRequest {
    pub amount: Option<Decimal>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub category: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
}

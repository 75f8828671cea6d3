//! Expense data models and API request types.
//!
//! This module defines:
//! - `PaymentType`: which balance field an expense is booked against
//! - `Expense`: a recorded expense
//! - `ExpenseRequest`: request body for creating or editing an expense
//! - `ExpenseEdit`: a validated edit, applied on top of the stored record

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// Largest amount a single expense may carry.
pub const MAX_EXPENSE_AMOUNT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// How an expense was paid.
///
/// Every expense is booked against exactly one of the two balance fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Online,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Online => "online",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentType::Cash),
            "online" => Ok(PaymentType::Online),
            other => Err(ParseEnumError::new("payment type", other)),
        }
    }
}

/// Lets sqlx decode the `kind` TEXT column straight into the enum.
impl TryFrom<String> for PaymentType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A recorded expense.
///
/// # Database Table
///
/// Maps to the `expenses` table. The owning `user_id` column is never
/// selected into this struct, so it cannot leak into responses.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount": 12.5,
///   "type": "cash",
///   "category": "Food",
///   "description": "coffee and bagel",
///   "date": "2025-01-15T08:30:00Z",
///   "createdAt": "2025-01-15T08:31:02Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,

    /// Amount spent, between 0 and `MAX_EXPENSE_AMOUNT` inclusive
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Balance field this expense is booked against
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub kind: PaymentType,

    pub category: String,

    /// Free text, empty when the client sent none
    pub description: String,

    /// When the money was spent (defaults to creation time)
    pub date: DateTime<Utc>,

    /// When the record was created; survives edits
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/expense` and `PUT /api/expense/{id}`.
///
/// Every field is optional at the wire level so that presence checks produce
/// a 400 with a readable message instead of a deserialization failure.
/// `amount` accepts a JSON number or a numeric string.
///
/// ```json
/// {
///   "amount": 12.5,
///   "type": "cash",
///   "category": "Food",
///   "description": "coffee",
///   "date": "2025-01-15"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub amount: Option<Decimal>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub category: Option<String>,

    pub description: Option<String>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date: Option<String>,
}

/// A validated edit of an existing expense.
///
/// Fields the client omitted fall back to the stored record, except
/// `description` which is cleared.
#[derive(Debug, Clone)]
pub struct ExpenseEdit {
    pub amount: Decimal,
    pub kind: Option<PaymentType>,
    pub category: Option<String>,
    pub description: String,
    pub date: Option<DateTime<Utc>>,
}

impl ExpenseEdit {
    /// Build the replacement record. `id` and `created_at` are preserved.
    pub fn apply_to(&self, old: &Expense) -> Expense {
        Expense {
            id: old.id,
            amount: self.amount,
            kind: self.kind.unwrap_or(old.kind),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| old.category.clone()),
            description: self.description.clone(),
            date: self.date.unwrap_or(old.date),
            created_at: old.created_at,
        }
    }
}

/// Filters applied by the store when listing expenses.
///
/// The free-text description search is not part of this filter; it is
/// applied after retrieval.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Exact category match
    pub category: Option<String>,

    /// Inclusive lower bound on `date`
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `date`
    pub end: Option<DateTime<Utc>>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.category
            .as_ref()
            .is_none_or(|category| &expense.category == category)
            && self.start.is_none_or(|start| expense.date >= start)
            && self.end.is_none_or(|end| expense.date <= end)
    }
}

/// Query string of `GET /api/expenses`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExpensesQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn stored() -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: Decimal::new(50, 0),
            kind: PaymentType::Cash,
            category: "Food".to_string(),
            description: "lunch".to_string(),
            date: Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, 12, 5, 0).unwrap(),
        }
    }

    #[test]
    fn test_payment_type_parse() {
        assert_eq!("cash".parse::<PaymentType>().unwrap(), PaymentType::Cash);
        assert_eq!("online".parse::<PaymentType>().unwrap(), PaymentType::Online);
        assert!("card".parse::<PaymentType>().is_err());
        assert!("Cash".parse::<PaymentType>().is_err());
    }

    #[test]
    fn test_edit_preserves_identity_and_creation_time() {
        let old = stored();
        let edit = ExpenseEdit {
            amount: Decimal::new(30, 0),
            kind: Some(PaymentType::Online),
            category: Some("Transport".to_string()),
            description: String::new(),
            date: None,
        };

        let updated = edit.apply_to(&old);

        assert_eq!(updated.id, old.id);
        assert_eq!(updated.created_at, old.created_at);
        assert_eq!(updated.date, old.date);
        assert_eq!(updated.kind, PaymentType::Online);
        assert_eq!(updated.category, "Transport");
        assert_eq!(updated.description, "");
    }

    #[test]
    fn test_edit_without_type_keeps_old_type() {
        let old = stored();
        let edit = ExpenseEdit {
            amount: Decimal::new(5, 0),
            kind: None,
            category: None,
            description: "snack".to_string(),
            date: None,
        };

        let updated = edit.apply_to(&old);

        assert_eq!(updated.kind, PaymentType::Cash);
        assert_eq!(updated.category, "Food");
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let expense = stored();
        let filter = ExpenseFilter {
            category: Some("Food".to_string()),
            start: Some(expense.date),
            end: Some(expense.date),
        };
        assert!(filter.matches(&expense));

        let other_category = ExpenseFilter {
            category: Some("Rent".to_string()),
            ..Default::default()
        };
        assert!(!other_category.matches(&expense));
    }

    #[test]
    fn test_request_accepts_numeric_strings() {
        let request: ExpenseRequest =
            serde_json::from_str(r#"{"amount":"12.50","type":"cash","category":"Food"}"#).unwrap();
        assert_eq!(request.amount, Some(Decimal::new(1250, 2)));
        assert_eq!(request.kind.as_deref(), Some("cash"));
        assert!(request.description.is_none());
    }

    #[test]
    fn test_serializes_camel_case_with_numeric_amount() {
        let value = serde_json::to_value(stored()).unwrap();
        assert_eq!(value["amount"], serde_json::json!(50.0));
        assert_eq!(value["type"], "cash");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("kind").is_none());
    }
}

//! Balance data models.
//!
//! A user has at most one balance record holding two independent amounts,
//! one per payment type. Neither amount is constrained to be non-negative,
//! but both stay within `±MAX_BALANCE`.

use std::ops::Add;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::expense::{Expense, PaymentType};

/// Largest magnitude either balance field may hold.
pub const MAX_BALANCE: i64 = 1_000_000_000_000_000;

/// Whether `amount` lies within `±MAX_BALANCE`.
pub fn within_balance_range(amount: Decimal) -> bool {
    amount.abs() <= Decimal::from(MAX_BALANCE)
}

/// Current balance of a user.
///
/// # Database Table
///
/// Maps to the `balances` table, one row per user.
///
/// # JSON Example
///
/// ```json
/// {
///   "cashAmount": 250.0,
///   "onlineAmount": 1200.5,
///   "updatedAt": "2025-01-15T10:00:00Z"
/// }
/// ```
///
/// `updatedAt` is omitted for a user who never set a balance.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(with = "rust_decimal::serde::float")]
    pub cash_amount: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub online_amount: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Balance {
    /// The implicit balance of a user without a stored record.
    pub fn empty() -> Self {
        Self {
            cash_amount: Decimal::ZERO,
            online_amount: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// The record after applying `delta`, stamped with `at`.
    ///
    /// Returns `None` when either field would leave `±MAX_BALANCE`.
    pub fn adjusted(&self, delta: BalanceDelta, at: DateTime<Utc>) -> Option<Balance> {
        let cash_amount = self.cash_amount.checked_add(delta.cash)?;
        let online_amount = self.online_amount.checked_add(delta.online)?;

        if !within_balance_range(cash_amount) || !within_balance_range(online_amount) {
            return None;
        }

        Some(Balance {
            cash_amount,
            online_amount,
            updated_at: Some(at),
        })
    }
}

/// Request body for `POST /api/balance`.
///
/// Both fields are required; each accepts a JSON number or a numeric string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    pub cash_amount: Option<Decimal>,
    pub online_amount: Option<Decimal>,
}

/// Signed change to both balance fields.
///
/// Every write that books, edits, refunds or materializes an expense is
/// expressed as one delta and applied to the stored balance in a single
/// step, so the two fields never drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    pub cash: Decimal,
    pub online: Decimal,
}

impl BalanceDelta {
    /// Add `amount` to the field of `kind`.
    pub fn credit(kind: PaymentType, amount: Decimal) -> Self {
        match kind {
            PaymentType::Cash => Self {
                cash: amount,
                online: Decimal::ZERO,
            },
            PaymentType::Online => Self {
                cash: Decimal::ZERO,
                online: amount,
            },
        }
    }

    /// Delta for booking a new expense.
    pub fn charge(expense: &Expense) -> Self {
        Self::credit(expense.kind, -expense.amount)
    }

    /// Delta for removing an expense.
    pub fn refund(expense: &Expense) -> Self {
        Self::credit(expense.kind, expense.amount)
    }

    /// Delta for replacing `old` with `new`: give back the old amount, then
    /// take the new one.
    pub fn replace(old: &Expense, new: &Expense) -> Self {
        Self::refund(old) + Self::charge(new)
    }

    pub fn is_zero(&self) -> bool {
        self.cash.is_zero() && self.online.is_zero()
    }
}

impl Add for BalanceDelta {
    type Output = BalanceDelta;

    fn add(self, rhs: BalanceDelta) -> BalanceDelta {
        BalanceDelta {
            cash: self.cash + rhs.cash,
            online: self.online + rhs.online,
        }
    }
}

//! Response shapes of the analytics endpoints.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Serialize, Serializer, ser::SerializeMap};

use super::budget::BudgetPeriod;

/// Spending totals over all windows, returned by `GET /api/stats`.
///
/// ```json
/// {
///   "today": { "total": 12.5, "count": 2 },
///   "week": { "total": 80.0, "count": 9 },
///   "month": { "total": 310.0, "count": 31 },
///   "byCategory": { "Food": 210.0, "Rent": 100.0 },
///   "byType": { "cash": 60.0, "online": 250.0 },
///   "trends": [ { "date": "2025-01-14", "amount": 20.0 } ],
///   "prediction": { "nextMonth": 310, "avgDaily": 10 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub today: WindowTotal,
    pub week: WindowTotal,
    pub month: WindowTotal,

    /// Sum per category over all expenses
    #[serde(serialize_with = "serialize_amount_map")]
    pub by_category: BTreeMap<String, Decimal>,

    /// Sum per payment type over all expenses
    pub by_type: TypeTotals,

    /// Daily totals over the trailing 30 days, oldest first
    pub trends: Vec<TrendPoint>,

    pub prediction: Prediction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowTotal {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub cash: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub online: Decimal,
}

/// Total spent on one calendar day (`YYYY-MM-DD`, UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Flat extrapolation of month-to-date spending, rounded to whole units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub next_month: i64,
    pub avg_daily: i64,
}

/// How close a budget is to its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// 90% up to (not including) 100% of the limit
    Warning,
    /// At or over the limit
    Danger,
}

/// A budget that has consumed at least 90% of its limit in the current
/// period. Returned by `GET /api/stats/budget/check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    pub category: String,
    pub period: BudgetPeriod,
    #[serde(with = "rust_decimal::serde::float")]
    pub limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spent: Decimal,
    /// Share of the limit consumed, rounded to a whole percent
    pub percentage: i64,
    pub severity: AlertSeverity,
}

fn serialize_amount_map<S>(map: &BTreeMap<String, Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, amount) in map {
        out.serialize_entry(key, &amount.to_f64().unwrap_or_default())?;
    }
    out.end()
}

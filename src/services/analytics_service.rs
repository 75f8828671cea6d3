//! Analytics service - spending statistics and budget alerts.
//!
//! Both reports are recomputed from the full expense list on every call;
//! nothing is persisted. All windows are computed in UTC:
//!
//! - today: from midnight today
//! - week: from midnight seven days ago
//! - month: from midnight on the first of the month
//! - trends: the trailing 30 days (`now - 30 days`), bucketed per day
//!
//! Window lower bounds are inclusive and there is no upper bound, so an
//! expense dated in the future counts in every window.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::{
    error::AppError,
    models::{
        budget::Budget,
        expense::{Expense, ExpenseFilter, PaymentType},
        start_of_day, start_of_month,
        stats::{AlertSeverity, BudgetAlert, Prediction, Stats, TrendPoint, TypeTotals, WindowTotal},
    },
    store::LedgerStore,
};

const TREND_DAYS: i64 = 30;
const PREDICTION_DAYS: i64 = 30;
const WARNING_PERCENT: Decimal = Decimal::from_parts(90, 0, 0, false, 0);
const DANGER_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Round half away from zero to a whole number.
fn round_whole(value: Decimal) -> i64 {
    let saturated = if value.is_sign_negative() { i64::MIN } else { i64::MAX };
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(saturated)
}

fn window(expenses: &[Expense], start: DateTime<Utc>) -> WindowTotal {
    expenses
        .iter()
        .filter(|e| e.date >= start)
        .fold(WindowTotal::default(), |mut acc, e| {
            acc.total += e.amount;
            acc.count += 1;
            acc
        })
}

/// Compute the statistics report for `expenses` as seen at `now`.
pub fn compute_stats(expenses: &[Expense], now: DateTime<Utc>) -> Stats {
    let today_start = start_of_day(now);
    let week_start = today_start - Duration::days(7);
    let month_start = start_of_month(now);

    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_type = TypeTotals::default();
    for expense in expenses {
        *by_category.entry(expense.category.clone()).or_default() += expense.amount;
        match expense.kind {
            PaymentType::Cash => by_type.cash += expense.amount,
            PaymentType::Online => by_type.online += expense.amount,
        }
    }

    let trend_start = now - Duration::days(TREND_DAYS);
    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for expense in expenses.iter().filter(|e| e.date >= trend_start) {
        *daily.entry(expense.date.date_naive()).or_default() += expense.amount;
    }
    let trends = daily
        .into_iter()
        .map(|(date, amount)| TrendPoint {
            date: date.format("%Y-%m-%d").to_string(),
            amount,
        })
        .collect();

    let month = window(expenses, month_start);
    let avg_daily = month.total / Decimal::from(PREDICTION_DAYS);
    let prediction = Prediction {
        next_month: round_whole(avg_daily * Decimal::from(PREDICTION_DAYS)),
        avg_daily: round_whole(avg_daily),
    };

    Stats {
        today: window(expenses, today_start),
        week: window(expenses, week_start),
        month,
        by_category,
        by_type,
        trends,
        prediction,
    }
}

/// Alerts for every budget that has consumed at least 90% of its limit in
/// its current period, in the order the budgets are given.
pub fn check_budgets(budgets: &[Budget], expenses: &[Expense], now: DateTime<Utc>) -> Vec<BudgetAlert> {
    budgets
        .iter()
        .filter(|budget| budget.limit_amount > Decimal::ZERO)
        .filter_map(|budget| {
            let start = budget.period.start(now);
            let spent: Decimal = expenses
                .iter()
                .filter(|e| e.category == budget.category && e.date >= start)
                .map(|e| e.amount)
                .sum();

            // A ratio too large for Decimal is far past the limit
            let Some(percentage) = spent
                .checked_div(budget.limit_amount)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            else {
                return Some(BudgetAlert {
                    category: budget.category.clone(),
                    period: budget.period,
                    limit: budget.limit_amount,
                    spent,
                    percentage: i64::MAX,
                    severity: AlertSeverity::Danger,
                });
            };
            if percentage < WARNING_PERCENT {
                return None;
            }

            Some(BudgetAlert {
                category: budget.category.clone(),
                period: budget.period,
                limit: budget.limit_amount,
                spent,
                percentage: round_whole(percentage),
                severity: if percentage >= DANGER_PERCENT {
                    AlertSeverity::Danger
                } else {
                    AlertSeverity::Warning
                },
            })
        })
        .collect()
}

#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn get_stats(
    store: &dyn LedgerStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Stats, AppError> {
    let expenses = store.list_expenses(user_id, &ExpenseFilter::default()).await?;
    Ok(compute_stats(&expenses, now))
}

#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn budget_alerts(
    store: &dyn LedgerStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<BudgetAlert>, AppError> {
    let budgets = store.list_budgets(user_id).await?;
    let expenses = store.list_expenses(user_id, &ExpenseFilter::default()).await?;

    let alerts = check_budgets(&budgets, &expenses, now);
    if !alerts.is_empty() {
        tracing::debug!(count = alerts.len(), "budget alerts raised");
    }

    Ok(alerts)
}

//! Budget service.
//!
//! A budget is identified by its `(category, period)` pair: saving a budget
//! for a pair that already has one overwrites its limit and keeps its id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::non_blank;
use crate::{
    error::AppError,
    models::budget::{Budget, BudgetDraft, BudgetPeriod, BudgetRequest, UpsertOutcome},
    store::LedgerStore,
};

/// Create the budget for `(category, period)` or overwrite the existing one.
///
/// # Validation
///
/// - `category`, `limitAmount` and `period` must be present
/// - `period` must be `daily`, `weekly` or `monthly`
/// - `limitAmount` must be greater than zero
#[tracing::instrument(skip(store, request), fields(user_id = %user_id))]
pub async fn save_budget(
    store: &dyn LedgerStore,
    user_id: &str,
    request: BudgetRequest,
    now: DateTime<Utc>,
) -> Result<(Budget, UpsertOutcome), AppError> {
    let (Some(category), Some(limit_amount), Some(period)) = (
        non_blank(request.category),
        request.limit_amount,
        non_blank(request.period),
    ) else {
        return Err(AppError::validation(
            "Category, limitAmount, and period are required",
        ));
    };

    let period: BudgetPeriod = period
        .parse()
        .map_err(|_| AppError::validation("Period must be daily, weekly, or monthly"))?;

    if limit_amount <= Decimal::ZERO {
        return Err(AppError::validation("Limit amount must be greater than zero"));
    }

    let draft = BudgetDraft {
        category,
        limit_amount,
        period,
    };
    let (budget, outcome) = store.upsert_budget(user_id, &draft, now).await?;
    tracing::info!(budget_id = %budget.id, category = %budget.category, period = %budget.period, ?outcome, "budget saved");

    Ok((budget, outcome))
}

pub async fn list_budgets(store: &dyn LedgerStore, user_id: &str) -> Result<Vec<Budget>, AppError> {
    Ok(store.list_budgets(user_id).await?)
}

/// Delete a budget. Unknown ids, including ones that are not UUIDs, are
/// not an error.
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn delete_budget(store: &dyn LedgerStore, user_id: &str, id: &str) -> Result<(), AppError> {
    if let Ok(id) = Uuid::parse_str(id) {
        store.delete_budget(user_id, id).await?;
    }
    Ok(())
}

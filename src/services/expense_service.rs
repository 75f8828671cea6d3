//! Expense service - recording, listing, editing and deleting expenses.
//!
//! Every write moves the user's balance along with the expense: adding
//! charges the field matching the payment type, deleting refunds it, and
//! editing refunds the old record and charges the new one. The store applies
//! the expense write and the balance delta as one atomic step.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{check_amount, non_blank, parse_optional_timestamp, parse_payment_type};
use crate::{
    error::AppError,
    models::expense::{Expense, ExpenseEdit, ExpenseFilter, ExpenseRequest, ListExpensesQuery},
    store::LedgerStore,
};

const EXPENSE_NOT_FOUND: &str = "Expense not found";

/// Record a new expense.
///
/// # Validation
///
/// - `amount`, `type` and `category` must be present (`amount` may be 0)
/// - `amount` must lie in `[0, 10000]`
/// - `type` must be `cash` or `online`
/// - `date`, when given, must be RFC 3339 or `YYYY-MM-DD`; defaults to `now`
///
/// # Errors
///
/// - `Validation`: any rule above is violated
/// - `Store`: the store failed; nothing was written
#[tracing::instrument(skip(store, request), fields(user_id = %user_id))]
pub async fn add_expense(
    store: &dyn LedgerStore,
    user_id: &str,
    request: ExpenseRequest,
    now: DateTime<Utc>,
) -> Result<Expense, AppError> {
    let (Some(amount), Some(kind), Some(category)) = (
        request.amount,
        non_blank(request.kind),
        non_blank(request.category),
    ) else {
        return Err(AppError::validation(
            "Amount, type, and category are required",
        ));
    };

    let amount = check_amount(amount)?;
    let kind = parse_payment_type(&kind)?;
    let date = parse_optional_timestamp(request.date, "date", false)?.unwrap_or(now);

    let expense = Expense {
        id: Uuid::new_v4(),
        amount,
        kind,
        category,
        description: request.description.unwrap_or_default(),
        date,
        created_at: now,
    };

    let saved = store.insert_expense(user_id, &expense, now).await?;
    tracing::info!(expense_id = %saved.id, amount = %saved.amount, kind = %saved.kind, "expense recorded");

    Ok(saved)
}

/// List the user's expenses, newest first.
///
/// `category`, `startDate` and `endDate` are passed to the store; blank
/// values are ignored. A bare `endDate` day includes the whole day. `search`
/// is a case-insensitive substring match on the description, applied after
/// retrieval.
#[tracing::instrument(skip(store, query), fields(user_id = %user_id))]
pub async fn list_expenses(
    store: &dyn LedgerStore,
    user_id: &str,
    query: ListExpensesQuery,
) -> Result<Vec<Expense>, AppError> {
    let filter = ExpenseFilter {
        category: non_blank(query.category),
        start: parse_optional_timestamp(query.start_date, "startDate", false)?,
        end: parse_optional_timestamp(query.end_date, "endDate", true)?,
    };

    let mut expenses = store.list_expenses(user_id, &filter).await?;

    if let Some(search) = non_blank(query.search) {
        let needle = search.to_lowercase();
        expenses.retain(|e| e.description.to_lowercase().contains(&needle));
    }

    Ok(expenses)
}

/// Replace an expense and move the balance from the old record to the new.
///
/// # Validation
///
/// `amount` is required and bounded as for a new expense. `type` and
/// `category` may be omitted, in which case the stored values are kept; a
/// `type` that is present must still be `cash` or `online`. An omitted
/// `description` clears it and an omitted `date` keeps the stored one.
///
/// # Errors
///
/// - `NotFound`: no such expense for this user (checked before validation)
/// - `Validation`: amount missing or out of bounds, bad type or date
/// - `Store`: the store failed; nothing was written
#[tracing::instrument(skip(store, request), fields(user_id = %user_id))]
pub async fn edit_expense(
    store: &dyn LedgerStore,
    user_id: &str,
    id: Uuid,
    request: ExpenseRequest,
    now: DateTime<Utc>,
) -> Result<Expense, AppError> {
    store
        .get_expense(user_id, id)
        .await?
        .ok_or(AppError::NotFound(EXPENSE_NOT_FOUND))?;

    let amount = request
        .amount
        .ok_or_else(|| AppError::validation("Amount is required"))?;

    let edit = ExpenseEdit {
        amount: check_amount(amount)?,
        kind: non_blank(request.kind)
            .map(|kind| parse_payment_type(&kind))
            .transpose()?,
        category: non_blank(request.category),
        description: request.description.unwrap_or_default(),
        date: parse_optional_timestamp(request.date, "date", false)?,
    };

    // The record can disappear between the lookup and the locked update
    let updated = store
        .replace_expense(user_id, id, &edit, now)
        .await?
        .ok_or(AppError::NotFound(EXPENSE_NOT_FOUND))?;
    tracing::info!(expense_id = %updated.id, amount = %updated.amount, kind = %updated.kind, "expense updated");

    Ok(updated)
}

/// Delete an expense and refund it to the balance.
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn delete_expense(
    store: &dyn LedgerStore,
    user_id: &str,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Expense, AppError> {
    let removed = store
        .delete_expense(user_id, id, now)
        .await?
        .ok_or(AppError::NotFound(EXPENSE_NOT_FOUND))?;
    tracing::info!(expense_id = %removed.id, "expense deleted");

    Ok(removed)
}

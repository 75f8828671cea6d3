//! Recurring service - templates and their materialization.
//!
//! # Firing
//!
//! A template is due when it is active and `next_due <= now`. Firing it
//! records one expense dated `now` (description prefixed with
//! `[Recurring] `), charges the balance, and advances `next_due` by exactly
//! one frequency unit from its previous value. A template that missed
//! several periods therefore catches up one period per apply.
//!
//! Each firing is a compare-and-swap on `next_due` in the store, so the
//! HTTP trigger and the background worker can run at the same time without
//! firing the same occurrence twice.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{check_amount, non_blank, parse_payment_type};
use crate::{
    error::AppError,
    models::recurring::{Frequency, RecurringExpense, RecurringRequest},
    store::LedgerStore,
};

/// Create a template whose first occurrence is one frequency unit from now.
///
/// # Validation
///
/// - `amount`, `type`, `category` and `frequency` must be present
/// - `frequency` must be `daily`, `weekly`, `monthly` or `yearly`
/// - `type` must be `cash` or `online`
/// - `amount` must lie in `[0, 10000]`
#[tracing::instrument(skip(store, request), fields(user_id = %user_id))]
pub async fn create_recurring(
    store: &dyn LedgerStore,
    user_id: &str,
    request: RecurringRequest,
    now: DateTime<Utc>,
) -> Result<RecurringExpense, AppError> {
    let (Some(amount), Some(kind), Some(category), Some(frequency)) = (
        request.amount,
        non_blank(request.kind),
        non_blank(request.category),
        non_blank(request.frequency),
    ) else {
        return Err(AppError::validation(
            "Amount, type, category, and frequency are required",
        ));
    };

    let frequency: Frequency = frequency
        .parse()
        .map_err(|_| AppError::validation("Invalid frequency"))?;
    let kind = parse_payment_type(&kind)?;
    let amount = check_amount(amount)?;
    let next_due = frequency
        .advance(now)
        .ok_or_else(|| AppError::validation("Next due date is out of range"))?;

    let template = RecurringExpense {
        id: Uuid::new_v4(),
        amount,
        kind,
        category,
        description: request.description.unwrap_or_default(),
        frequency,
        next_due,
        active: true,
        created_at: now,
    };

    let saved = store.insert_recurring(user_id, &template).await?;
    tracing::info!(template_id = %saved.id, %frequency, next_due = %saved.next_due, "recurring expense created");

    Ok(saved)
}

pub async fn list_recurring(
    store: &dyn LedgerStore,
    user_id: &str,
) -> Result<Vec<RecurringExpense>, AppError> {
    Ok(store.list_recurring(user_id).await?)
}

/// Delete a template. Unknown ids, including ones that are not UUIDs, are
/// not an error.
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn delete_recurring(
    store: &dyn LedgerStore,
    user_id: &str,
    id: &str,
) -> Result<(), AppError> {
    if let Ok(id) = Uuid::parse_str(id) {
        store.delete_recurring(user_id, id).await?;
    }
    Ok(())
}

/// Fire every active template of the user that is due at `now`.
///
/// Returns the templates that fired, as they were before firing. Templates
/// claimed concurrently by another caller are skipped.
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn apply_due(
    store: &dyn LedgerStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<RecurringExpense>, AppError> {
    let templates = store.list_active_recurring(user_id).await?;
    let mut applied = Vec::new();

    for template in templates.into_iter().filter(|t| t.is_due(now)) {
        let Some(advanced) = template.frequency.advance(template.next_due) else {
            tracing::warn!(template_id = %template.id, "next due date out of range, skipping");
            continue;
        };

        let expense = template.materialize(now);
        let fired = store
            .fire_recurring(user_id, template.id, template.next_due, advanced, &expense)
            .await?;

        if fired {
            tracing::info!(template_id = %template.id, expense_id = %expense.id, next_due = %advanced, "recurring expense applied");
            applied.push(template);
        } else {
            tracing::debug!(template_id = %template.id, "occurrence already claimed");
        }
    }

    Ok(applied)
}

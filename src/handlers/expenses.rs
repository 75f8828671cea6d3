//! Expense HTTP handlers.
//!
//! This module implements the expense endpoints, mounted under both
//! `/api/expense` and `/api/expenses`:
//! - POST / - Record an expense
//! - GET / - List expenses with optional filters
//! - PUT /{id} - Replace an expense
//! - DELETE /{id} - Delete an expense

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::MessageResponse;
use crate::{
    app::AppState,
    error::AppError,
    extract::ApiJson,
    identity::AuthContext,
    models::expense::{Expense, ExpenseRequest, ListExpensesQuery},
    services::expense_service,
};

#[derive(Debug, Serialize)]
pub struct ExpenseAdded {
    pub message: &'static str,
    pub id: Uuid,
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
pub struct ExpenseUpdated {
    pub message: &'static str,
    pub expense: Expense,
}

/// Path ids that are not UUIDs cannot name an expense.
fn expense_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Expense not found"))
}

/// Record an expense and charge it to the balance.
///
/// # Request Body
///
/// ```json
/// {
///   "amount": 12.5,
///   "type": "cash",
///   "category": "Food",
///   "description": "coffee",   // optional
///   "date": "2025-01-15"       // optional, defaults to now
/// }
/// ```
///
/// # Response
///
/// - **200**: `{"message": "Expense added", "id": "...", "expense": {...}}`
/// - **400**: missing field, amount outside `[0, 10000]`, unknown type
pub async fn add_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<ExpenseRequest>,
) -> Result<Json<ExpenseAdded>, AppError> {
    let expense =
        expense_service::add_expense(state.store.as_ref(), &auth.user_id, request, Utc::now())
            .await?;

    Ok(Json(ExpenseAdded {
        message: "Expense added",
        id: expense.id,
        expense,
    }))
}

/// List expenses, newest first.
///
/// # Query Parameters
///
/// - `category` - exact match
/// - `startDate` / `endDate` - inclusive bounds on `date`
/// - `search` - case-insensitive substring of the description
pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let expenses =
        expense_service::list_expenses(state.store.as_ref(), &auth.user_id, query).await?;
    Ok(Json(expenses))
}

/// Replace an expense.
///
/// # Response
///
/// - **200**: `{"message": "Expense updated", "expense": {...}}`
/// - **404**: unknown id
/// - **400**: amount missing or outside `[0, 10000]`, unknown type
pub async fn edit_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ExpenseRequest>,
) -> Result<Json<ExpenseUpdated>, AppError> {
    let id = expense_id(&id)?;
    let expense =
        expense_service::edit_expense(state.store.as_ref(), &auth.user_id, id, request, Utc::now())
            .await?;

    Ok(Json(ExpenseUpdated {
        message: "Expense updated",
        expense,
    }))
}

/// Delete an expense and refund the balance.
pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = expense_id(&id)?;
    expense_service::delete_expense(state.store.as_ref(), &auth.user_id, id, Utc::now()).await?;

    Ok(Json(MessageResponse::new("Expense deleted")))
}

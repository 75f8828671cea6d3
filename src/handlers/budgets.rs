//! Budget HTTP handlers.
//!
//! - GET /api/budgets - List budgets
//! - POST /api/budgets - Create or update the budget for a category and period
//! - DELETE /api/budgets/{id} - Delete a budget

use axum::{
    Extension, Json,
    extract::{Path, State},
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
    models::budget::{Budget, BudgetRequest, UpsertOutcome},
    services::budget_service,
};

#[derive(Debug, Serialize)]
pub struct BudgetSaved {
    pub message: &'static str,
    pub id: Uuid,
    pub budget: Budget,
}

pub async fn list_budgets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Budget>>, AppError> {
    let budgets = budget_service::list_budgets(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(budgets))
}

/// # Request Body
///
/// ```json
/// { "category": "Food", "limitAmount": 300, "period": "monthly" }
/// ```
///
/// # Response
///
/// `{"message": "Budget created" | "Budget updated", "id": "...", "budget": {...}}`.
/// Saving the same category and period again keeps the id.
pub async fn save_budget(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<BudgetRequest>,
) -> Result<Json<BudgetSaved>, AppError> {
    let (budget, outcome) =
        budget_service::save_budget(state.store.as_ref(), &auth.user_id, request, Utc::now())
            .await?;

    let message = match outcome {
        UpsertOutcome::Created => "Budget created",
        UpsertOutcome::Updated => "Budget updated",
    };

    Ok(Json(BudgetSaved {
        message,
        id: budget.id,
        budget,
    }))
}

/// Always succeeds for ids the caller does not own.
pub async fn delete_budget(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    budget_service::delete_budget(state.store.as_ref(), &auth.user_id, &id).await?;
    Ok(Json(MessageResponse::new("Budget deleted")))
}

//! Analytics HTTP handlers.
//!
//! - GET /api/stats - Spending statistics
//! - GET /api/stats/budget/check - Budgets at or above 90% of their limit

use axum::{Extension, Json, extract::State};
use chrono::Utc;

use crate::{
    app::AppState,
    error::AppError,
    identity::AuthContext,
    models::stats::{BudgetAlert, Stats},
    services::analytics_service,
};

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Stats>, AppError> {
    let stats =
        analytics_service::get_stats(state.store.as_ref(), &auth.user_id, Utc::now()).await?;
    Ok(Json(stats))
}

/// # Response
///
/// ```json
/// [
///   {
///     "category": "Food",
///     "period": "monthly",
///     "limit": 100.0,
///     "spent": 92.5,
///     "percentage": 93,
///     "severity": "warning"
///   }
/// ]
/// ```
pub async fn check_budgets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BudgetAlert>>, AppError> {
    let alerts =
        analytics_service::budget_alerts(state.store.as_ref(), &auth.user_id, Utc::now()).await?;
    Ok(Json(alerts))
}

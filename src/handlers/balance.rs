//! Balance HTTP handlers.
//!
//! - GET /api/balance - Current cash/online balance
//! - POST /api/balance - Overwrite both balance fields

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::{
    app::AppState,
    error::AppError,
    extract::ApiJson,
    identity::AuthContext,
    models::balance::{Balance, BalanceRequest},
    services::balance_service,
};

#[derive(Debug, Serialize)]
pub struct BalanceSaved {
    pub message: &'static str,
    pub balance: Balance,
}

/// Returns `{"cashAmount": 0, "onlineAmount": 0}` for a user who never set
/// a balance.
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Balance>, AppError> {
    let balance = balance_service::get_balance(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(balance))
}

/// # Request Body
///
/// ```json
/// { "cashAmount": 250, "onlineAmount": "1200.50" }
/// ```
///
/// # Response
///
/// - **200**: `{"message": "Balance updated", "balance": {...}}`
/// - **400**: either field missing or not numeric
pub async fn set_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<BalanceRequest>,
) -> Result<Json<BalanceSaved>, AppError> {
    let balance =
        balance_service::set_balance(state.store.as_ref(), &auth.user_id, request, Utc::now())
            .await?;

    Ok(Json(BalanceSaved {
        message: "Balance updated",
        balance,
    }))
}

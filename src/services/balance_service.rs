//! Balance service.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::balance::{Balance, BalanceRequest, within_balance_range},
    store::LedgerStore,
};

/// Current balance, or zero in both fields when none was ever set.
pub async fn get_balance(store: &dyn LedgerStore, user_id: &str) -> Result<Balance, AppError> {
    Ok(store
        .get_balance(user_id)
        .await?
        .unwrap_or_else(Balance::empty))
}

/// Overwrite both balance fields.
///
/// This is a direct override, not an adjustment. Both fields are required;
/// a field that is absent or `null` is a validation error, while `0` is a
/// valid value. Each field must lie within `±MAX_BALANCE`.
#[tracing::instrument(skip(store, request), fields(user_id = %user_id))]
pub async fn set_balance(
    store: &dyn LedgerStore,
    user_id: &str,
    request: BalanceRequest,
    now: DateTime<Utc>,
) -> Result<Balance, AppError> {
    let (Some(cash_amount), Some(online_amount)) = (request.cash_amount, request.online_amount)
    else {
        return Err(AppError::validation(
            "Both cashAmount and onlineAmount are required",
        ));
    };
    if !within_balance_range(cash_amount) || !within_balance_range(online_amount) {
        return Err(AppError::validation(
            "Balance amounts cannot exceed 1,000,000,000,000,000",
        ));
    }

    let balance = store
        .set_balance(
            user_id,
            &Balance {
                cash_amount,
                online_amount,
                updated_at: Some(now),
            },
        )
        .await?;
    tracing::info!(cash = %balance.cash_amount, online = %balance.online_amount, "balance set");

    Ok(balance)
}

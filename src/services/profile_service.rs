//! Profile service.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::profile::{Profile, ProfileRequest},
    store::LedgerStore,
};

pub async fn get_profile(store: &dyn LedgerStore, user_id: &str) -> Result<Profile, AppError> {
    store
        .get_profile(user_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found"))
}

/// Merge `name`/`email` into the profile, creating it on first use.
///
/// When the body has no `email` and none is stored yet, `token_email` (the
/// verified token's email claim) is saved instead.
#[tracing::instrument(skip(store, request, token_email), fields(user_id = %user_id))]
pub async fn save_profile(
    store: &dyn LedgerStore,
    user_id: &str,
    mut request: ProfileRequest,
    token_email: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Profile, AppError> {
    if request.email.is_none() {
        let stored = store.get_profile(user_id).await?;
        if stored.and_then(|p| p.email).is_none() {
            request.email = token_email.map(str::to_string);
        }
    }

    let profile = store.save_profile(user_id, &request, now).await?;
    tracing::debug!("profile saved");
    Ok(profile)
}

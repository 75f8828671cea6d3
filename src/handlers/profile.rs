//! Profile HTTP handlers.
//!
//! - GET /api/profile - Read the caller's profile
//! - POST /api/profile - Create or merge the caller's profile

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::{
    app::AppState,
    error::AppError,
    extract::ApiJson,
    identity::AuthContext,
    models::profile::{Profile, ProfileRequest},
    services::profile_service,
};

#[derive(Debug, Serialize)]
pub struct ProfileSaved {
    pub message: &'static str,
    pub profile: Profile,
}

/// # Response
///
/// - **200**: `{"name": "...", "email": "...", "updatedAt": "..."}`
/// - **404**: no profile saved yet
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Profile>, AppError> {
    let profile = profile_service::get_profile(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(profile))
}

/// Omitted fields keep their stored value. A profile without an e-mail
/// takes the one from the caller's token.
pub async fn save_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<ProfileRequest>,
) -> Result<Json<ProfileSaved>, AppError> {
    let profile = profile_service::save_profile(
        state.store.as_ref(),
        &auth.user_id,
        request,
        auth.email.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(ProfileSaved {
        message: "Profile updated",
        profile,
    }))
}

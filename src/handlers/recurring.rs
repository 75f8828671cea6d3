//! Recurring expense HTTP handlers.
//!
//! - GET /api/recurring - List templates
//! - POST /api/recurring - Create a template
//! - DELETE /api/recurring/{id} - Delete a template
//! - POST /api/recurring/apply - Fire the caller's due templates now

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
    models::recurring::{RecurringExpense, RecurringRequest},
    services::recurring_service,
};

#[derive(Debug, Serialize)]
pub struct RecurringCreated {
    pub message: &'static str,
    pub id: Uuid,
    pub recurring: RecurringExpense,
}

#[derive(Debug, Serialize)]
pub struct RecurringApplied {
    pub message: String,
    pub applied: Vec<RecurringExpense>,
}

pub async fn list_recurring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<RecurringExpense>>, AppError> {
    let templates = recurring_service::list_recurring(state.store.as_ref(), &auth.user_id).await?;
    Ok(Json(templates))
}

/// # Request Body
///
/// ```json
/// {
///   "amount": 9.99,
///   "type": "online",
///   "category": "Subscriptions",
///   "description": "music",
///   "frequency": "monthly"
/// }
/// ```
pub async fn create_recurring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(request): ApiJson<RecurringRequest>,
) -> Result<Json<RecurringCreated>, AppError> {
    let recurring =
        recurring_service::create_recurring(state.store.as_ref(), &auth.user_id, request, Utc::now())
            .await?;

    Ok(Json(RecurringCreated {
        message: "Recurring expense created",
        id: recurring.id,
        recurring,
    }))
}

pub async fn delete_recurring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    recurring_service::delete_recurring(state.store.as_ref(), &auth.user_id, &id).await?;
    Ok(Json(MessageResponse::new("Recurring expense deleted")))
}

/// # Response
///
/// ```json
/// { "message": "Applied 1 recurring expense(s)", "applied": [ {...} ] }
/// ```
///
/// `applied` lists the templates that fired, with their `nextDue` as it was
/// before firing.
pub async fn apply_recurring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<RecurringApplied>, AppError> {
    let applied =
        recurring_service::apply_due(state.store.as_ref(), &auth.user_id, Utc::now()).await?;

    Ok(Json(RecurringApplied {
        message: format!("Applied {} recurring expense(s)", applied.len()),
        applied,
    }))
}

//! User profile document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name and contact e-mail of a user.
///
/// Maps to the `profiles` table. The profile is created by the first
/// `POST /api/profile`; until then `GET` answers 404.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/profile`.
///
/// Fields that are omitted are left unchanged on an existing profile.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

//! User entity and profile DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use stepiva_core::enneagram::EnneagramResult;
use stepiva_core::types::{Timestamp, UserId};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub enneagram_result: Option<Json<EnneagramResult>>,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or updating the caller's profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// DTO for toggling delivery channels.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationPreferences {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

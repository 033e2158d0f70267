//! Notification entity and DTOs.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use stepiva_core::notification::{EmailStatus, NotificationMeta, NotificationType};
use stepiva_core::types::{DbId, Timestamp, UserId};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    pub user_id: UserId,
    pub plan_id: Option<DbId>,
    pub milestone_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub prompt: String,
    pub used_fallback: bool,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub feedback: Option<String>,
    pub feedback_summary: Option<String>,
    pub email_status: Json<EmailStatus>,
    pub notification_meta: Json<NotificationMeta>,
    pub created_at: Timestamp,
}

impl Notification {
    /// Parsed type; rows are constrained by a CHECK so this only falls back
    /// on schema drift.
    pub fn kind(&self) -> NotificationType {
        NotificationType::parse(&self.notification_type).unwrap_or(NotificationType::Daily)
    }
}

/// Insert DTO built by the nudge pipeline.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: UserId,
    pub plan_id: Option<DbId>,
    pub milestone_id: Option<String>,
    pub notification_type: NotificationType,
    pub prompt: String,
    pub used_fallback: bool,
    pub notification_meta: NotificationMeta,
}

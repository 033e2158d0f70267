//! Notification kinds and the JSON metadata stored alongside each one.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// How long a reminder stays relevant in the notification feed.
pub const REMINDER_TTL_DAYS: i64 = 7;

/// Users without a plan are nudged at most once per this many days.
pub const NO_PLAN_LOOKBACK_DAYS: i64 = 7;

/// Email attempts per notification before giving up.
pub const MAX_EMAIL_ATTEMPTS: i32 = 3;

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Value of the `notifications.notification_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MilestoneReminder,
    NoPlanReminder,
    Daily,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::MilestoneReminder => "milestone_reminder",
            NotificationType::NoPlanReminder => "no_plan_reminder",
            NotificationType::Daily => "daily",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "milestone_reminder" => Ok(NotificationType::MilestoneReminder),
            "no_plan_reminder" => Ok(NotificationType::NoPlanReminder),
            "daily" => Ok(NotificationType::Daily),
            other => Err(CoreError::Validation(format!(
                "Unknown notification type '{other}'"
            ))),
        }
    }

    /// Subject line used for email delivery.
    pub fn email_subject(self) -> &'static str {
        match self {
            NotificationType::MilestoneReminder => "Your milestone nudge from Stepiva",
            NotificationType::NoPlanReminder => "Ready to set your next goal?",
            NotificationType::Daily => "Your daily Stepiva check-in",
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Display/triage metadata stored in `notifications.notification_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMeta {
    pub priority: String,
    pub category: String,
    pub expires_at: Timestamp,
}

impl NotificationMeta {
    /// Metadata for a notification of `kind` created at `now`.
    pub fn for_type(kind: NotificationType, now: Timestamp) -> Self {
        let (priority, category) = match kind {
            NotificationType::MilestoneReminder => ("normal", "milestone"),
            NotificationType::NoPlanReminder => ("low", "onboarding"),
            NotificationType::Daily => ("normal", "daily"),
        };
        Self {
            priority: priority.to_string(),
            category: category.to_string(),
            expires_at: now + Duration::days(REMINDER_TTL_DAYS),
        }
    }
}

/// Email delivery outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Skipped,
}

/// Email tracking stored in `notifications.email_status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatus {
    pub sent: bool,
    pub attempts: i32,
    pub delivery_status: DeliveryStatus,
}

impl EmailStatus {
    pub fn sent(attempts: i32) -> Self {
        Self {
            sent: true,
            attempts,
            delivery_status: DeliveryStatus::Sent,
        }
    }

    pub fn failed(attempts: i32) -> Self {
        Self {
            sent: false,
            attempts,
            delivery_status: DeliveryStatus::Failed,
        }
    }

    pub fn skipped() -> Self {
        Self {
            sent: false,
            attempts: 0,
            delivery_status: DeliveryStatus::Skipped,
        }
    }
}

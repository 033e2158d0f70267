//! Scheduler-facing reminder trigger.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::cron::CronAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderTriggerResponse {
    pub status: &'static str,
    pub reminders_queued: usize,
    pub message: String,
}

/// GET|POST /api/milestoneReminders
///
/// Find every due reminder and queue one background task per candidate.
/// Responds as soon as the tasks are spawned; failures inside them are
/// logged.
pub async fn trigger_reminders(
    _cron: CronAuth,
    State(state): State<AppState>,
) -> AppResult<Json<ReminderTriggerResponse>> {
    let now = Utc::now();
    let scanner = state.reminder_scanner();
    let candidates = scanner.find_due(now.date_naive(), now).await?;
    let queued = scanner.spawn(candidates);

    tracing::info!(queued, "Reminder scan triggered");
    Ok(Json(ReminderTriggerResponse {
        status: "success",
        reminders_queued: queued,
        message: format!("Queued {queued} reminder(s)"),
    }))
}

//! Handlers for the `/notifications` resource and nudge feedback.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use stepiva_core::error::CoreError;
use stepiva_core::types::DbId;
use stepiva_core::usage::StoreOperation;
use stepiva_db::repositories::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// Body of `POST /feedback`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub notification_id: DbId,
    pub feedback: String,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/notifications
///
/// List the authenticated user's notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    let unread_only = params.unread_only.unwrap_or(false);

    let notifications =
        NotificationRepo::list_for_user(&state.pool, &auth.user_id, unread_only, limit, offset)
            .await?;
    state.track_store(StoreOperation::Read, "notifications", notifications.len());

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/notifications/{id}/read
///
/// Mark a single notification as read. Returns 204 No Content on success,
/// including when it was already read, or 404 if the notification does not
/// belong to the authenticated user.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id, &auth.user_id).await?;

    if !found {
        return Err(AppError::Core(CoreError::not_found(
            "Notification",
            notification_id,
        )));
    }
    state.track_store(StoreOperation::Write, "notifications", 1);

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// POST /api/feedback
///
/// Store the caller's free-text reaction to a nudge. The condensed summary
/// that later nudges read is produced by `/chatbot/feedback-summarize`.
pub async fn submit_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    let feedback = input.feedback.trim();
    if feedback.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Feedback must not be empty".into(),
        )));
    }

    let notification =
        NotificationRepo::set_feedback(&state.pool, input.notification_id, &auth.user_id, feedback)
            .await?
            .ok_or_else(|| CoreError::not_found("Notification", input.notification_id))?;
    state.track_store(StoreOperation::Write, "notifications", 1);

    tracing::info!(
        user_id = %auth.user_id,
        notification_id = notification.id,
        "Feedback stored"
    );
    Ok(Json(DataResponse { data: notification }))
}

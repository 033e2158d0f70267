//! Handlers for the caller's own profile under `/users/me`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use stepiva_core::error::CoreError;
use stepiva_core::progress::{compute_progress, PlanProgressInput};
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::user::{UpdateNotificationPreferences, UpsertUser};
use stepiva_db::repositories::{PlanRepo, UserRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/users/me
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, &auth.user_id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", &auth.user_id))?;
    state.track_store(StoreOperation::Read, "users", 1);
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/users/me
///
/// Create the caller's profile on first call, update it afterwards.
pub async fn upsert_me(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertUser>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::upsert(&state.pool, &auth.user_id, &input).await?;
    state.track_store(StoreOperation::Write, "users", 1);
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/users/me/notification-preferences
pub async fn update_notification_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNotificationPreferences>,
) -> AppResult<impl IntoResponse> {
    UserRepo::ensure_exists(&state.pool, &auth.user_id).await?;
    state.track_store(StoreOperation::Write, "users", 1);
    let user = UserRepo::update_notification_preferences(&state.pool, &auth.user_id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("User", &auth.user_id))?;
    state.track_store(StoreOperation::Write, "users", 1);

    tracing::info!(
        user_id = %auth.user_id,
        email = user.email_notifications,
        push = user.push_notifications,
        "Notification preferences updated"
    );
    Ok(Json(DataResponse { data: user }))
}

/// GET /api/users/me/progress
///
/// XP, level and streak across all of the caller's plans.
pub async fn get_progress(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let plans = PlanRepo::list_for_user(&state.pool, &auth.user_id, None).await?;
    state.track_store(StoreOperation::Read, "plans", plans.len());

    let mut inputs = Vec::with_capacity(plans.len());
    for plan in &plans {
        inputs.push(PlanProgressInput {
            status: plan.status()?,
            milestones: &plan.milestones.0,
        });
    }

    let summary = compute_progress(&inputs, Utc::now().date_naive());
    Ok(Json(DataResponse { data: summary }))
}

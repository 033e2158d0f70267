//! Web Push subscription management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use stepiva_core::error::CoreError;
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::push_subscription::CreatePushSubscription;
use stepiva_db::repositories::{PushSubscriptionRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /unsubscribe-push`.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// POST /api/subscribe-push
///
/// Register the browser subscription for the caller. Re-subscribing an
/// endpoint moves it to the caller. Returns 201.
pub async fn subscribe(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePushSubscription>,
) -> AppResult<impl IntoResponse> {
    if !input.endpoint.starts_with("https://") {
        return Err(AppError::Core(CoreError::Validation(
            "Push endpoint must be an https URL".into(),
        )));
    }
    if input.keys.p256dh.is_empty() || input.keys.auth.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Push subscription keys must not be empty".into(),
        )));
    }

    UserRepo::ensure_exists(&state.pool, &auth.user_id).await?;
    state.track_store(StoreOperation::Write, "users", 1);
    let subscription = PushSubscriptionRepo::upsert(&state.pool, &auth.user_id, &input).await?;
    state.track_store(StoreOperation::Write, "push_subscriptions", 1);

    tracing::info!(user_id = %auth.user_id, subscription_id = subscription.id, "Push subscription stored");
    Ok((StatusCode::CREATED, Json(DataResponse { data: subscription })))
}

/// POST /api/unsubscribe-push
///
/// Remove one of the caller's subscriptions. Returns 204 whether or not the
/// endpoint was registered.
pub async fn unsubscribe(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UnsubscribeRequest>,
) -> AppResult<StatusCode> {
    if PushSubscriptionRepo::delete_for_user(&state.pool, &auth.user_id, &input.endpoint).await? {
        state.track_store(StoreOperation::Delete, "push_subscriptions", 1);
        tracing::info!(user_id = %auth.user_id, "Push subscription removed");
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Assistant-backed summaries: nudge feedback and the Enneagram assessment.
//!
//! When no assistant is configured both endpoints store a template summary.
//! When the assistant is configured but fails, the caller gets 502 with the
//! upstream error in `details` and nothing is stored.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stepiva_assistant::AssistantError;
use stepiva_core::enneagram::{
    build_summary_prompt, fallback_summary, score_responses, AssessmentResponse, EnneagramResult,
    EnneagramScores,
};
use stepiva_core::error::CoreError;
use stepiva_core::nudge::{build_feedback_summary_prompt, fallback_feedback_summary};
use stepiva_core::types::DbId;
use stepiva_core::usage::StoreOperation;
use stepiva_db::repositories::{NotificationRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::nudge::{PURPOSE_ENNEAGRAM_SUMMARY, PURPOSE_FEEDBACK_SUMMARY};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /chatbot/feedback-summarize`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummarizeRequest {
    pub notification_id: DbId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub notification_id: DbId,
    pub summary: String,
    pub used_fallback: bool,
}

/// Body of `POST /chatbot/enneagram-summarize`.
///
/// Either precomputed `scores` (nine values) or raw chat `responses` must be
/// supplied; `scores` wins when both are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnneagramSummarizeRequest {
    pub scores: Option<Vec<f64>>,
    pub responses: Option<Vec<AssessmentResponse>>,
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnneagramSummary {
    #[serde(flatten)]
    pub result: EnneagramResult,
    pub used_fallback: bool,
}

fn upstream(message: &str, err: AssistantError) -> AppError {
    AppError::Upstream {
        message: message.to_string(),
        details: Some(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/chatbot/feedback-summarize
///
/// Condense the feedback stored on a notification into one sentence and
/// save it as the notification's `feedbackSummary`.
pub async fn summarize_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FeedbackSummarizeRequest>,
) -> AppResult<impl IntoResponse> {
    let notification = NotificationRepo::find_by_id(&state.pool, input.notification_id)
        .await?
        .filter(|n| n.user_id == auth.user_id)
        .ok_or_else(|| CoreError::not_found("Notification", input.notification_id))?;
    state.track_store(StoreOperation::Read, "notifications", 1);

    let feedback = notification
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Notification has no feedback to summarize".into(),
            ))
        })?;

    let prompt = build_feedback_summary_prompt(&notification.prompt, feedback);
    let reply = state
        .nudges()
        .ask(PURPOSE_FEEDBACK_SUMMARY, Some(&auth.user_id), &prompt)
        .await
        .map_err(|e| upstream("Failed to summarize feedback", e))?;

    let used_fallback = reply.is_none();
    let summary = reply.unwrap_or_else(|| fallback_feedback_summary(feedback));

    NotificationRepo::set_feedback_summary(&state.pool, notification.id, &summary).await?;
    state.track_store(StoreOperation::Write, "notifications", 1);

    Ok(Json(DataResponse {
        data: FeedbackSummary {
            notification_id: notification.id,
            summary,
            used_fallback,
        },
    }))
}

/// POST /api/chatbot/enneagram-summarize
///
/// Score the assessment, ask the assistant for a personality summary and
/// store the result on the caller's user row.
pub async fn summarize_enneagram(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EnneagramSummarizeRequest>,
) -> AppResult<impl IntoResponse> {
    let scores = match (input.scores.as_deref(), input.responses.as_deref()) {
        (Some(scores), _) => EnneagramScores::from_slice(scores)?,
        (None, Some(responses)) => score_responses(responses)?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Provide either scores or responses".into(),
            ))
        }
    };

    let prompt = build_summary_prompt(&scores, input.transcript.as_deref());
    let reply = state
        .nudges()
        .ask(PURPOSE_ENNEAGRAM_SUMMARY, Some(&auth.user_id), &prompt)
        .await
        .map_err(|e| upstream("Failed to summarize assessment", e))?;

    let used_fallback = reply.is_none();
    let summary = reply.unwrap_or_else(|| fallback_summary(&scores));
    let result = EnneagramResult::new(scores, summary, Utc::now());

    UserRepo::ensure_exists(&state.pool, &auth.user_id).await?;
    state.track_store(StoreOperation::Write, "users", 1);
    UserRepo::set_enneagram_result(&state.pool, &auth.user_id, &result)
        .await?
        .ok_or_else(|| CoreError::not_found("User", &auth.user_id))?;
    state.track_store(StoreOperation::Write, "users", 1);

    tracing::info!(
        user_id = %auth.user_id,
        dominant_type = result.dominant_type,
        used_fallback,
        "Enneagram result stored"
    );
    Ok(Json(DataResponse {
        data: EnneagramSummary {
            result,
            used_fallback,
        },
    }))
}

use axum::routing::post;
use axum::Router;

use crate::handlers::chatbot;
use crate::state::AppState;

/// Routes mounted at `/chatbot`.
///
/// ```text
/// POST /feedback-summarize    -> summarize_feedback
/// POST /enneagram-summarize   -> summarize_enneagram
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feedback-summarize", post(chatbot::summarize_feedback))
        .route("/enneagram-summarize", post(chatbot::summarize_enneagram))
}

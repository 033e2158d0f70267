use axum::routing::{get, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/users/me`.
///
/// ```text
/// GET  /                           -> get_me
/// PUT  /                           -> upsert_me
/// PUT  /notification-preferences   -> update_notification_preferences
/// GET  /progress                   -> get_progress
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user::get_me).put(user::upsert_me))
        .route(
            "/notification-preferences",
            put(user::update_notification_preferences),
        )
        .route("/progress", get(user::get_progress))
}

use axum::routing::get;
use axum::Router;

use crate::handlers::reminders;
use crate::state::AppState;

/// ```text
/// GET|POST /milestoneReminders  -> trigger_reminders
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/milestoneReminders",
        get(reminders::trigger_reminders).post(reminders::trigger_reminders),
    )
}

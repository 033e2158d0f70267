pub mod admin;
pub mod chatbot;
pub mod health;
pub mod notification;
pub mod plan;
pub mod push;
pub mod reminders;
pub mod steps;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /milestoneReminders                               trigger reminder scan (GET, POST; cron secret)
///
/// /plan/first-nudge                                 first nudge for a new plan (POST)
///
/// /plans                                            list, create
/// /plans/generate                                   assistant-drafted plan (POST)
/// /plans/{plan_id}                                  get, update, delete
/// /plans/{plan_id}/milestones/{milestone_id}        toggle completion (PATCH)
///
/// /steps                                            list, create, update, delete
///
/// /notifications                                    list
/// /notifications/{id}/read                          mark read (POST)
/// /feedback                                         store nudge feedback (POST)
///
/// /chatbot/feedback-summarize                       summarize feedback (POST)
/// /chatbot/enneagram-summarize                      score + summarize assessment (POST)
///
/// /users/me                                         get, upsert
/// /users/me/notification-preferences                update (PUT)
/// /users/me/progress                                XP, level, streak (GET)
///
/// /subscribe-push                                   register subscription (POST)
/// /unsubscribe-push                                 remove subscription (POST)
///
/// /admin/usage                                      cost dashboard (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Reminder pipeline trigger.
        .merge(reminders::router())
        // Plans, milestones and the first nudge.
        .merge(plan::first_nudge_router())
        .nest("/plans", plan::router())
        .nest("/steps", steps::router())
        // Notifications and feedback.
        .nest("/notifications", notification::router())
        .merge(notification::feedback_router())
        .nest("/chatbot", chatbot::router())
        .nest("/users/me", user::router())
        .merge(push::router())
        .nest("/admin", admin::router())
}

//! Route definitions for plans and their milestones.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::plan;
use crate::state::AppState;

/// Routes mounted at `/plans`.
///
/// ```text
/// GET    /                                      -> list_plans
/// POST   /                                      -> create_plan
/// POST   /generate                              -> generate_plan
/// GET    /{plan_id}                             -> get_plan
/// PATCH  /{plan_id}                             -> update_plan
/// DELETE /{plan_id}                             -> delete_plan
/// PATCH  /{plan_id}/milestones/{milestone_id}   -> update_milestone
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(plan::list_plans).post(plan::create_plan))
        .route("/generate", post(plan::generate_plan))
        .route(
            "/{plan_id}",
            get(plan::get_plan)
                .patch(plan::update_plan)
                .delete(plan::delete_plan),
        )
        .route(
            "/{plan_id}/milestones/{milestone_id}",
            patch(plan::update_milestone),
        )
}

/// `POST /plan/first-nudge`, kept on its singular legacy path.
pub fn first_nudge_router() -> Router<AppState> {
    Router::new().route("/plan/first-nudge", post(plan::first_nudge))
}

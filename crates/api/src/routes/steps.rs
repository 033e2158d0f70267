use axum::routing::get;
use axum::Router;

use crate::handlers::steps;
use crate::state::AppState;

/// Routes mounted at `/steps`. Plan and milestone ids travel in the query
/// string (GET, DELETE) or the JSON body (POST, PATCH).
///
/// ```text
/// GET    /   -> list_steps
/// POST   /   -> create_step
/// PATCH  /   -> update_step
/// DELETE /   -> delete_step
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(steps::list_steps)
            .post(steps::create_step)
            .patch(steps::update_step)
            .delete(steps::delete_step),
    )
}

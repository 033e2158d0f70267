use axum::routing::post;
use axum::Router;

use crate::handlers::push;
use crate::state::AppState;

/// ```text
/// POST /subscribe-push     -> subscribe
/// POST /unsubscribe-push   -> unsubscribe
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe-push", post(push::subscribe))
        .route("/unsubscribe-push", post(push::unsubscribe))
}

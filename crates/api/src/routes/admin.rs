use axum::routing::get;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler takes [`RequireAdmin`].
///
/// ```text
/// GET /usage?days=   -> usage_summary
/// ```
///
/// [`RequireAdmin`]: crate::middleware::rbac::RequireAdmin
pub fn router() -> Router<AppState> {
    Router::new().route("/usage", get(admin::usage_summary))
}

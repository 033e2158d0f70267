//! Admin-only cost dashboard.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use stepiva_db::repositories::UsageRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_USAGE_DAYS: i64 = 30;
const MAX_USAGE_DAYS: i64 = 365;

/// Query parameters for `GET /admin/usage`.
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Window size in days. Defaults to 30, clamped to `1..=365`.
    pub days: Option<i64>,
}

/// GET /api/admin/usage?days=
///
/// Token and storage totals with estimated cost over the last `days` days.
pub async fn usage_summary(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<UsageQuery>,
) -> AppResult<impl IntoResponse> {
    let days = params
        .days
        .unwrap_or(DEFAULT_USAGE_DAYS)
        .clamp(1, MAX_USAGE_DAYS);
    let since = Utc::now() - Duration::days(days);

    let summary = UsageRepo::summarize_since(&state.pool, since).await?;
    Ok(Json(DataResponse { data: summary }))
}

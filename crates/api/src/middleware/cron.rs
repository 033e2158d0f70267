//! Shared-secret guard for scheduler-invoked endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use stepiva_core::error::CoreError;

use super::auth::bearer_token;
use crate::error::AppError;
use crate::state::AppState;

/// Passes when `CRON_SECRET` is unset, or when the request carries
/// `Authorization: Bearer <CRON_SECRET>`.
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.cron_secret.as_deref() else {
            return Ok(CronAuth);
        };
        if bearer_token(parts)? != secret {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid cron secret".into(),
            )));
        }
        Ok(CronAuth)
    }
}

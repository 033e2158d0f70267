//! Handlers for `/steps`: the commitments embedded under a milestone.
//!
//! Steps have no table of their own. Every write goes through
//! [`edit_milestones`], which locks the owning plan row for the duration of
//! the edit.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use stepiva_core::plan::{find_milestone, find_milestone_mut, StepSource};
use stepiva_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::handlers::plan::{edit_milestones, load_owned_plan};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /steps`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepListQuery {
    pub plan_id: DbId,
    pub milestone_id: String,
}

/// Query parameters for `DELETE /steps`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDeleteQuery {
    pub plan_id: DbId,
    pub milestone_id: String,
    pub step_id: String,
}

/// Body of `POST /steps`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStepRequest {
    pub plan_id: DbId,
    pub milestone_id: String,
    pub title: String,
    #[serde(default)]
    pub source: StepSource,
    pub nudge_id: Option<DbId>,
}

/// Body of `PATCH /steps`. At least one of `completed` and `title` is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStepRequest {
    pub plan_id: DbId,
    pub milestone_id: String,
    pub step_id: String,
    pub completed: Option<bool>,
    pub title: Option<String>,
}

/// GET /api/steps?planId=&milestoneId=
pub async fn list_steps(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StepListQuery>,
) -> AppResult<impl IntoResponse> {
    let plan = load_owned_plan(&state, params.plan_id, &auth.user_id).await?;
    let milestone = find_milestone(&plan.milestones.0, &params.milestone_id)?;
    Ok(Json(DataResponse {
        data: milestone.steps.clone(),
    }))
}

/// POST /api/steps
///
/// Append a step to a milestone. Returns 201 with the new step.
pub async fn create_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateStepRequest>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let step = edit_milestones(&state, input.plan_id, &auth.user_id, |milestones| {
        let milestone = find_milestone_mut(milestones, &input.milestone_id)?;
        milestone
            .add_step(&input.title, input.source, input.nudge_id, now)
            .cloned()
    })
    .await?;

    tracing::debug!(
        plan_id = input.plan_id,
        milestone_id = %input.milestone_id,
        step_id = %step.id,
        "Step created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: step })))
}

/// PATCH /api/steps
///
/// Rename a step and/or toggle its completion. Completing sets
/// `completedAt`; reopening clears it.
pub async fn update_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateStepRequest>,
) -> AppResult<impl IntoResponse> {
    if input.completed.is_none() && input.title.is_none() {
        return Err(AppError::BadRequest(
            "Provide completed and/or title".into(),
        ));
    }

    let now = Utc::now();
    let step = edit_milestones(&state, input.plan_id, &auth.user_id, |milestones| {
        let milestone = find_milestone_mut(milestones, &input.milestone_id)?;
        if let Some(title) = input.title.as_deref() {
            milestone.rename_step(&input.step_id, title)?;
        }
        if let Some(completed) = input.completed {
            milestone.set_step_completed(&input.step_id, completed, now)?;
        }
        milestone.step(&input.step_id).cloned()
    })
    .await?;

    Ok(Json(DataResponse { data: step }))
}

/// DELETE /api/steps?planId=&milestoneId=&stepId=
///
/// Returns 204 No Content.
pub async fn delete_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StepDeleteQuery>,
) -> AppResult<StatusCode> {
    edit_milestones(&state, params.plan_id, &auth.user_id, |milestones| {
        find_milestone_mut(milestones, &params.milestone_id)?.remove_step(&params.step_id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

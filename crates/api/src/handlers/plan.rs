//! Handlers for the `/plans` resource and the first-nudge trigger.
//!
//! All endpoints require authentication via [`AuthUser`]. Plans are visible
//! only to their owner; any other caller gets 403.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use stepiva_core::error::CoreError;
use stepiva_core::plan::{
    build_milestones, find_milestone_mut, select_first_nudge_milestone, validate_goal, Milestone,
    NudgeFrequency, PlanStatus,
};
use stepiva_core::plan_draft::{
    build_plan_prompt, fallback_milestones, parse_plan_reply, DEFAULT_PLAN_HORIZON_DAYS,
};
use stepiva_core::types::{Date, DbId};
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::plan::{CreatePlan, NewPlan, Plan, UpdatePlan};
use stepiva_db::repositories::{PlanRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::nudge::PURPOSE_PLAN_DRAFT;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /plans`.
#[derive(Debug, Deserialize)]
pub struct PlanListQuery {
    /// Only plans with this status (`active`, `paused`, `completed`).
    pub status: Option<String>,
}

/// Body of `POST /plans/generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    pub goal_type: String,
    pub goal: String,
    pub target_date: Option<Date>,
    #[serde(default)]
    pub nudge_frequency: Option<NudgeFrequency>,
}

/// A freshly drafted plan and whether the template draft was used.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    #[serde(flatten)]
    pub plan: Plan,
    pub used_fallback: bool,
}

/// Body of `PATCH /plans/{plan_id}/milestones/{milestone_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateMilestoneRequest {
    pub completed: bool,
}

/// Body of `POST /plan/first-nudge`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstNudgeRequest {
    pub plan_id: DbId,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstNudgeResponse {
    pub notification_id: DbId,
    pub prompt: String,
    pub used_fallback: bool,
    pub milestone_id: String,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load a plan and verify the caller owns it.
pub(crate) async fn load_owned_plan(
    state: &AppState,
    plan_id: DbId,
    user_id: &str,
) -> AppResult<Plan> {
    let plan = PlanRepo::find_by_id(&state.pool, plan_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Plan", plan_id))?;
    state.track_store(StoreOperation::Read, "plans", 1);
    ensure_owner(&plan, user_id)?;
    Ok(plan)
}

fn ensure_owner(plan: &Plan, user_id: &str) -> AppResult<()> {
    if !plan.is_owned_by(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this plan".into(),
        )));
    }
    Ok(())
}

/// Apply `edit` to a plan's milestones while holding the plan row lock.
///
/// The read, the edit and the write share one transaction, so concurrent
/// step edits on the same plan serialize instead of overwriting each other.
pub(crate) async fn edit_milestones<T, F>(
    state: &AppState,
    plan_id: DbId,
    user_id: &str,
    edit: F,
) -> AppResult<T>
where
    F: FnOnce(&mut Vec<Milestone>) -> Result<T, CoreError>,
{
    let mut tx = state.pool.begin().await?;
    let plan = PlanRepo::find_for_update(&mut tx, plan_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Plan", plan_id))?;
    ensure_owner(&plan, user_id)?;

    let mut milestones = plan.milestones.0;
    let output = edit(&mut milestones)?;
    PlanRepo::save_milestones(&mut tx, plan_id, &milestones).await?;
    tx.commit().await?;

    state.track_store(StoreOperation::Read, "plans", 1);
    state.track_store(StoreOperation::Write, "plans", 1);
    Ok(output)
}

async fn insert_plan(state: &AppState, plan: NewPlan) -> AppResult<Plan> {
    UserRepo::ensure_exists(&state.pool, &plan.user_id).await?;
    state.track_store(StoreOperation::Write, "users", 1);
    let created = PlanRepo::create(&state.pool, &plan).await?;
    state.track_store(StoreOperation::Write, "plans", 1);

    tracing::info!(
        user_id = %created.user_id,
        plan_id = created.id,
        milestones = created.milestones.0.len(),
        "Plan created"
    );
    Ok(created)
}

// ---------------------------------------------------------------------------
// Plan CRUD
// ---------------------------------------------------------------------------

/// GET /api/plans
pub async fn list_plans(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PlanListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(PlanStatus::parse)
        .transpose()?;

    let plans =
        PlanRepo::list_for_user(&state.pool, &auth.user_id, status.map(PlanStatus::as_str))
            .await?;
    state.track_store(StoreOperation::Read, "plans", plans.len());

    Ok(Json(DataResponse { data: plans }))
}

/// POST /api/plans
///
/// Create a plan from client-supplied milestones. Returns 201.
pub async fn create_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePlan>,
) -> AppResult<impl IntoResponse> {
    validate_goal(&input.goal_type, &input.goal)?;
    let milestones = build_milestones(input.milestones)?;

    let plan = insert_plan(
        &state,
        NewPlan {
            user_id: auth.user_id,
            goal_type: input.goal_type.trim().to_string(),
            goal: input.goal.trim().to_string(),
            target_date: input.target_date,
            nudge_frequency: input.nudge_frequency.unwrap_or_default(),
            milestones,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: plan })))
}

/// POST /api/plans/generate
///
/// Ask the assistant to draft milestones for a goal. When the assistant is
/// unavailable, fails, or replies with something unusable, a three-phase
/// template plan is stored instead. Returns 201.
pub async fn generate_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<GeneratePlanRequest>,
) -> AppResult<impl IntoResponse> {
    validate_goal(&input.goal_type, &input.goal)?;
    let goal_type = input.goal_type.trim();
    let goal = input.goal.trim();

    let today = Utc::now().date_naive();
    let target_date = input
        .target_date
        .filter(|d| *d >= today)
        .unwrap_or(today + Duration::days(DEFAULT_PLAN_HORIZON_DAYS));

    let prompt = build_plan_prompt(goal_type, goal, today, target_date);
    let drafted = match state
        .nudges()
        .ask(PURPOSE_PLAN_DRAFT, Some(&auth.user_id), &prompt)
        .await
    {
        Ok(Some(reply)) => match parse_plan_reply(&reply).and_then(build_milestones) {
            Ok(milestones) => Some(milestones),
            Err(e) => {
                tracing::warn!(user_id = %auth.user_id, error = %e, "Unusable plan draft, using fallback");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(user_id = %auth.user_id, error = %e, "Plan draft failed, using fallback");
            None
        }
    };

    let used_fallback = drafted.is_none();
    let milestones = match drafted {
        Some(milestones) => milestones,
        None => build_milestones(fallback_milestones(goal, today, Some(target_date)))?,
    };

    let plan = insert_plan(
        &state,
        NewPlan {
            user_id: auth.user_id,
            goal_type: goal_type.to_string(),
            goal: goal.to_string(),
            target_date: Some(target_date),
            nudge_frequency: input.nudge_frequency.unwrap_or_default(),
            milestones,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: GeneratedPlan {
                plan,
                used_fallback,
            },
        }),
    ))
}

/// GET /api/plans/{plan_id}
pub async fn get_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let plan = load_owned_plan(&state, plan_id, &auth.user_id).await?;
    Ok(Json(DataResponse { data: plan }))
}

/// PATCH /api/plans/{plan_id}
///
/// Change status and/or nudge frequency.
pub async fn update_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
    Json(input): Json<UpdatePlan>,
) -> AppResult<impl IntoResponse> {
    if input.status.is_none() && input.nudge_frequency.is_none() {
        return Err(AppError::BadRequest(
            "Provide status and/or nudgeFrequency".into(),
        ));
    }
    load_owned_plan(&state, plan_id, &auth.user_id).await?;

    let plan = PlanRepo::update(
        &state.pool,
        plan_id,
        input.status.map(PlanStatus::as_str),
        input.nudge_frequency.map(NudgeFrequency::as_str),
    )
    .await?
    .ok_or_else(|| CoreError::not_found("Plan", plan_id))?;
    state.track_store(StoreOperation::Write, "plans", 1);

    tracing::info!(plan_id, status = %plan.status, "Plan updated");
    Ok(Json(DataResponse { data: plan }))
}

/// DELETE /api/plans/{plan_id}
///
/// Returns 204 No Content, 403 for another user's plan.
pub async fn delete_plan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(plan_id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_owned_plan(&state, plan_id, &auth.user_id).await?;

    if !PlanRepo::delete(&state.pool, plan_id).await? {
        return Err(AppError::Core(CoreError::not_found("Plan", plan_id)));
    }
    state.track_store(StoreOperation::Delete, "plans", 1);

    tracing::info!(plan_id, user_id = %auth.user_id, "Plan deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/plans/{plan_id}/milestones/{milestone_id}
///
/// Mark a milestone completed or open again.
pub async fn update_milestone(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((plan_id, milestone_id)): Path<(DbId, String)>,
    Json(input): Json<UpdateMilestoneRequest>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let milestone = edit_milestones(&state, plan_id, &auth.user_id, |milestones| {
        let milestone = find_milestone_mut(milestones, &milestone_id)?;
        milestone.set_completed(input.completed, now);
        Ok(milestone.clone())
    })
    .await?;

    Ok(Json(DataResponse { data: milestone }))
}

// ---------------------------------------------------------------------------
// First nudge
// ---------------------------------------------------------------------------

/// POST /api/plan/first-nudge
///
/// Generate and store the first nudge for a plan the caller just created.
/// Delivery runs in the background; the response carries the stored text.
pub async fn first_nudge(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FirstNudgeRequest>,
) -> AppResult<impl IntoResponse> {
    if input.user_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "userId does not match the authenticated user".into(),
        )));
    }
    let plan = load_owned_plan(&state, input.plan_id, &auth.user_id).await?;

    let today = Utc::now().date_naive();
    let milestone = select_first_nudge_milestone(&plan.milestones.0, today)
        .cloned()
        .ok_or_else(|| CoreError::Conflict("All milestones are already completed".into()))?;

    let notification = state
        .nudges()
        .create_milestone_nudge(&plan, &milestone)
        .await?;

    let dispatcher = Arc::clone(&state.dispatcher);
    let queued = notification.clone();
    tokio::spawn(async move {
        dispatcher.dispatch(&queued).await;
    });

    Ok(Json(DataResponse {
        data: FirstNudgeResponse {
            notification_id: notification.id,
            prompt: notification.prompt,
            used_fallback: notification.used_fallback,
            milestone_id: milestone.id,
        },
    }))
}

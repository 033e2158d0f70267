//! Plan entity and DTOs. Milestones and steps live inside the JSONB
//! `milestones` column.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use stepiva_core::error::CoreError;
use stepiva_core::plan::{Milestone, NewMilestone, NudgeFrequency, PlanStatus};
use stepiva_core::types::{Date, DbId, Timestamp, UserId};

/// A row from the `plans` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: DbId,
    pub user_id: UserId,
    pub goal_type: String,
    pub goal: String,
    pub target_date: Option<Date>,
    pub status: String,
    pub nudge_frequency: String,
    pub milestones: Json<Vec<Milestone>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Plan {
    pub fn status(&self) -> Result<PlanStatus, CoreError> {
        PlanStatus::parse(&self.status)
    }

    /// Stored frequency; unknown values fall back to the default.
    pub fn nudge_frequency(&self) -> NudgeFrequency {
        NudgeFrequency::parse(&self.nudge_frequency).unwrap_or_default()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// DTO for creating a plan from client-supplied milestones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlan {
    pub goal_type: String,
    pub goal: String,
    pub target_date: Option<Date>,
    #[serde(default)]
    pub nudge_frequency: Option<NudgeFrequency>,
    pub milestones: Vec<NewMilestone>,
}

/// DTO for `PATCH /plans/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlan {
    pub status: Option<PlanStatus>,
    pub nudge_frequency: Option<NudgeFrequency>,
}

/// Insert DTO with validated, id-assigned milestones.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub user_id: UserId,
    pub goal_type: String,
    pub goal: String,
    pub target_date: Option<Date>,
    pub nudge_frequency: NudgeFrequency,
    pub milestones: Vec<Milestone>,
}

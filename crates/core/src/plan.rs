//! Goal plans and their embedded milestones and steps.
//!
//! A plan owns an ordered list of [`Milestone`]s and each milestone owns its
//! [`Step`]s. Persistence stores the whole milestone array as one JSONB
//! document, so every mutation here works on the in-memory array and the
//! caller writes it back.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

/// Maximum length of a step title, in characters.
pub const MAX_STEP_TITLE_LEN: usize = 200;

/// Maximum length of a milestone title, in characters.
pub const MAX_MILESTONE_TITLE_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Plan status / frequency
// ---------------------------------------------------------------------------

/// Lifecycle state of a plan. Only `active` plans receive reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Paused,
    Completed,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Paused => "paused",
            PlanStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "active" => Ok(PlanStatus::Active),
            "paused" => Ok(PlanStatus::Paused),
            "completed" => Ok(PlanStatus::Completed),
            other => Err(CoreError::Validation(format!(
                "Invalid plan status '{other}'. Must be one of: active, paused, completed"
            ))),
        }
    }
}

/// How often a plan's active milestones are nudged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeFrequency {
    #[default]
    Daily,
    Weekly,
}

impl NudgeFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            NudgeFrequency::Daily => "daily",
            NudgeFrequency::Weekly => "weekly",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "daily" => Ok(NudgeFrequency::Daily),
            "weekly" => Ok(NudgeFrequency::Weekly),
            other => Err(CoreError::Validation(format!(
                "Invalid nudge frequency '{other}'. Must be one of: daily, weekly"
            ))),
        }
    }

    /// Window during which an existing reminder suppresses a new one.
    pub fn lookback(self) -> Duration {
        match self {
            NudgeFrequency::Daily => Duration::days(1),
            NudgeFrequency::Weekly => Duration::days(7),
        }
    }
}

/// Who created a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepSource {
    #[default]
    User,
    Ai,
}

// ---------------------------------------------------------------------------
// Step / Milestone
// ---------------------------------------------------------------------------

/// A single commitment under a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub source: StepSource,
    /// Notification that suggested this step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nudge_id: Option<DbId>,
}

/// A dated sub-goal within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Date,
    pub due_date: Date,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blind_spot_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_hook: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Milestone as supplied by a client or drafted by the assistant, before ids
/// are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMilestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Date,
    pub due_date: Date,
    #[serde(default)]
    pub blind_spot_tip: Option<String>,
    #[serde(default)]
    pub strength_hook: Option<String>,
}

impl NewMilestone {
    fn validate(&self) -> Result<(), CoreError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation(
                "Milestone title must not be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_MILESTONE_TITLE_LEN {
            return Err(CoreError::Validation(format!(
                "Milestone title must be at most {MAX_MILESTONE_TITLE_LEN} characters"
            )));
        }
        if self.start_date > self.due_date {
            return Err(CoreError::Validation(format!(
                "Milestone '{title}' starts ({}) after it is due ({})",
                self.start_date, self.due_date
            )));
        }
        Ok(())
    }

    fn into_milestone(self) -> Milestone {
        Milestone {
            id: Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            start_date: self.start_date,
            due_date: self.due_date,
            completed: false,
            completed_at: None,
            blind_spot_tip: non_empty(self.blind_spot_tip),
            strength_hook: non_empty(self.strength_hook),
            steps: Vec::new(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate and materialize client-supplied milestones.
///
/// Assigns fresh ids and orders the result by start date (stable, so
/// milestones sharing a start date keep their submitted order).
pub fn build_milestones(input: Vec<NewMilestone>) -> Result<Vec<Milestone>, CoreError> {
    if input.is_empty() {
        return Err(CoreError::Validation(
            "A plan needs at least one milestone".to_string(),
        ));
    }
    for milestone in &input {
        milestone.validate()?;
    }
    let mut milestones: Vec<Milestone> = input.into_iter().map(NewMilestone::into_milestone).collect();
    milestones.sort_by_key(|m| m.start_date);
    Ok(milestones)
}

/// Validate the free-text goal fields of a plan.
pub fn validate_goal(goal_type: &str, goal: &str) -> Result<(), CoreError> {
    if goal_type.trim().is_empty() {
        return Err(CoreError::Validation("goalType must not be empty".to_string()));
    }
    if goal.trim().is_empty() {
        return Err(CoreError::Validation("goal must not be empty".to_string()));
    }
    Ok(())
}

/// Trim and validate a step title, returning the normalized title.
pub fn validate_step_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Step title must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_STEP_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Step title must be at most {MAX_STEP_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

impl Milestone {
    /// Whether the milestone is open and its date window contains `today`.
    pub fn is_due_on(&self, today: Date) -> bool {
        !self.completed && self.start_date <= today && today <= self.due_date
    }

    pub fn completed_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    pub fn step(&self, step_id: &str) -> Result<&Step, CoreError> {
        self.steps
            .iter()
            .find(|s| s.id == step_id)
            .ok_or_else(|| CoreError::not_found("Step", step_id))
    }

    fn step_mut(&mut self, step_id: &str) -> Result<&mut Step, CoreError> {
        self.steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| CoreError::not_found("Step", step_id))
    }

    /// Append a new, not yet completed step.
    pub fn add_step(
        &mut self,
        title: &str,
        source: StepSource,
        nudge_id: Option<DbId>,
        now: Timestamp,
    ) -> Result<&Step, CoreError> {
        let title = validate_step_title(title)?;
        let index = self.steps.len();
        self.steps.push(Step {
            id: Uuid::new_v4().to_string(),
            title,
            completed: false,
            completed_at: None,
            created_at: now,
            source,
            nudge_id,
        });
        Ok(&self.steps[index])
    }

    /// Mark a step completed or open again.
    ///
    /// Completing an already completed step keeps its original
    /// `completed_at`.
    pub fn set_step_completed(
        &mut self,
        step_id: &str,
        completed: bool,
        now: Timestamp,
    ) -> Result<&Step, CoreError> {
        let step = self.step_mut(step_id)?;
        if completed {
            if !step.completed || step.completed_at.is_none() {
                step.completed_at = Some(now);
            }
        } else {
            step.completed_at = None;
        }
        step.completed = completed;
        Ok(&*step)
    }

    pub fn rename_step(&mut self, step_id: &str, title: &str) -> Result<&Step, CoreError> {
        let title = validate_step_title(title)?;
        let step = self.step_mut(step_id)?;
        step.title = title;
        Ok(&*step)
    }

    pub fn remove_step(&mut self, step_id: &str) -> Result<Step, CoreError> {
        let index = self
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| CoreError::not_found("Step", step_id))?;
        Ok(self.steps.remove(index))
    }

    /// Toggle milestone completion, mirroring step timestamp semantics.
    pub fn set_completed(&mut self, completed: bool, now: Timestamp) {
        if completed {
            if !self.completed || self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

pub fn find_milestone<'a>(
    milestones: &'a [Milestone],
    milestone_id: &str,
) -> Result<&'a Milestone, CoreError> {
    milestones
        .iter()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| CoreError::not_found("Milestone", milestone_id))
}

pub fn find_milestone_mut<'a>(
    milestones: &'a mut [Milestone],
    milestone_id: &str,
) -> Result<&'a mut Milestone, CoreError> {
    milestones
        .iter_mut()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| CoreError::not_found("Milestone", milestone_id))
}

/// Pick the milestone the first nudge of a new plan should talk about.
///
/// Prefers the earliest-starting milestone due today, then the
/// earliest-starting open milestone. `None` when everything is completed.
pub fn select_first_nudge_milestone(milestones: &[Milestone], today: Date) -> Option<&Milestone> {
    milestones
        .iter()
        .filter(|m| m.is_due_on(today))
        .min_by_key(|m| m.start_date)
        .or_else(|| {
            milestones
                .iter()
                .filter(|m| !m.completed)
                .min_by_key(|m| m.start_date)
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

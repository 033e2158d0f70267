//! Nudge context, assistant prompt and deterministic fallback texts.

use serde::Serialize;

use crate::enneagram::EnneagramType;
use crate::plan::Milestone;
use crate::types::Date;

/// Number of prior feedback summaries included in a nudge context.
pub const MAX_HISTORICAL_FEEDBACK: usize = 5;

/// Everything the assistant is told about a milestone when writing a nudge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeContext {
    pub goal_type: String,
    pub goal: String,
    pub milestone_title: String,
    pub milestone_description: String,
    pub start_date: Date,
    pub due_date: Date,
    pub completed_steps: usize,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blind_spot_tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enneagram_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_advice: Option<&'static str>,
    /// Most recent first.
    pub historical_feedback: Vec<String>,
}

impl NudgeContext {
    /// Context built from plan data alone.
    pub fn for_milestone(goal_type: &str, goal: &str, milestone: &Milestone) -> Self {
        Self {
            goal_type: goal_type.to_string(),
            goal: goal.to_string(),
            milestone_title: milestone.title.clone(),
            milestone_description: milestone.description.clone(),
            start_date: milestone.start_date,
            due_date: milestone.due_date,
            completed_steps: milestone.completed_step_count(),
            total_steps: milestone.steps.len(),
            blind_spot_tip: milestone.blind_spot_tip.clone(),
            strength_hook: milestone.strength_hook.clone(),
            personality_summary: None,
            enneagram_type: None,
            growth_advice: None,
            historical_feedback: Vec::new(),
        }
    }

    /// Attach the user's personality profile.
    pub fn with_personality(mut self, summary: Option<String>, kind: Option<EnneagramType>) -> Self {
        self.personality_summary = summary.filter(|s| !s.trim().is_empty());
        self.enneagram_type = kind.map(EnneagramType::number);
        self.growth_advice = kind.map(EnneagramType::growth_advice);
        self
    }

    /// Attach prior feedback summaries, keeping at most
    /// [`MAX_HISTORICAL_FEEDBACK`] non-blank entries.
    pub fn with_feedback(mut self, feedback: Vec<String>) -> Self {
        self.historical_feedback = feedback
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .take(MAX_HISTORICAL_FEEDBACK)
            .collect();
        self
    }
}

const NUDGE_INSTRUCTIONS: &str = "Write a short, warm, motivating nudge (2-4 sentences) for the \
user working on the milestone below. Suggest exactly one concrete next step they can take today. \
Adapt tone to their personality profile and avoid repeating themes they pushed back on in past \
feedback. Reply with the nudge text only.";

/// Message sent to the assistant thread for a milestone nudge.
pub fn build_prompt(ctx: &NudgeContext) -> String {
    let context = serde_json::to_string_pretty(ctx).unwrap_or_default();
    format!("{NUDGE_INSTRUCTIONS}\n\nContext:\n{context}")
}

/// Deterministic nudge used whenever the assistant is unavailable.
pub fn fallback_nudge(ctx: &NudgeContext) -> String {
    let progress = if ctx.total_steps > 0 {
        format!(
            " You've completed {} of {} steps so far.",
            ctx.completed_steps, ctx.total_steps
        )
    } else {
        String::new()
    };

    let tip = ctx
        .strength_hook
        .as_deref()
        .or(ctx.growth_advice)
        .map(|t| format!(" {t}"))
        .unwrap_or_default();

    format!(
        "Your milestone \"{}\" is in progress and due {}.{progress}{tip} \
         Take one small step today toward your goal: {}.",
        ctx.milestone_title,
        ctx.due_date.format("%B %-d"),
        ctx.goal.trim_end_matches('.'),
    )
}

/// Text of the reminder sent to users who have not created a plan yet.
pub fn no_plan_reminder_text() -> &'static str {
    "You haven't set up a goal plan yet. Take two minutes today to pick one goal \
     that matters to you, and Stepiva will break it into milestones you can act on."
}

/// Longest fallback feedback summary, in characters.
pub const MAX_FEEDBACK_SUMMARY_LEN: usize = 200;

/// Message asking the assistant to condense a user's reaction to a nudge.
pub fn build_feedback_summary_prompt(nudge: &str, feedback: &str) -> String {
    format!(
        "Summarize in one sentence what this user's feedback tells a coach about how they \
         want to be nudged. Reply with the sentence only.\n\nNudge:\n{nudge}\n\nFeedback:\n{feedback}"
    )
}

/// Feedback condensed without the assistant: whitespace collapsed and cut
/// to [`MAX_FEEDBACK_SUMMARY_LEN`] characters.
pub fn fallback_feedback_summary(feedback: &str) -> String {
    let collapsed = feedback.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_FEEDBACK_SUMMARY_LEN {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(MAX_FEEDBACK_SUMMARY_LEN - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::plan::{build_milestones, NewMilestone};

    fn sample_milestone() -> Milestone {
        build_milestones(vec![NewMilestone {
            title: "Draft chapter one".to_string(),
            description: "First 3000 words".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 4, 14).unwrap(),
            blind_spot_tip: None,
            strength_hook: None,
        }])
        .unwrap()
        .remove(0)
    }

    #[test]
    fn fallback_mentions_title_and_due_date() {
        let ctx = NudgeContext::for_milestone("creative", "Write a novel.", &sample_milestone());
        let text = fallback_nudge(&ctx);
        assert!(text.contains("\"Draft chapter one\""));
        assert!(text.contains("April 14"));
        assert!(text.ends_with("Write a novel."));
    }

    #[test]
    fn fallback_is_deterministic() {
        let ctx = NudgeContext::for_milestone("creative", "Write a novel", &sample_milestone());
        assert_eq!(fallback_nudge(&ctx), fallback_nudge(&ctx));
    }

    #[test]
    fn fallback_prefers_strength_hook_over_growth_advice() {
        let mut milestone = sample_milestone();
        milestone.strength_hook = Some("Your curiosity is your engine.".to_string());
        let kind = EnneagramType::new(5).unwrap();
        let ctx = NudgeContext::for_milestone("creative", "Write a novel", &milestone)
            .with_personality(None, Some(kind));
        let text = fallback_nudge(&ctx);
        assert!(text.contains("Your curiosity is your engine."));
        assert!(!text.contains(kind.growth_advice()));
    }

    #[test]
    fn fallback_uses_growth_advice_without_hook() {
        let kind = EnneagramType::new(1).unwrap();
        let ctx = NudgeContext::for_milestone("health", "Run a 10k", &sample_milestone())
            .with_personality(Some("Principled".into()), Some(kind));
        assert!(fallback_nudge(&ctx).contains(kind.growth_advice()));
    }

    #[test]
    fn feedback_is_trimmed_and_capped() {
        let feedback = (0..8).map(|i| format!(" note {i} ")).chain([" ".to_string()]).collect();
        let ctx = NudgeContext::for_milestone("g", "goal", &sample_milestone()).with_feedback(feedback);
        assert_eq!(ctx.historical_feedback.len(), MAX_HISTORICAL_FEEDBACK);
        assert_eq!(ctx.historical_feedback[0], "note 0");
    }

    #[test]
    fn prompt_embeds_context_json() {
        let ctx = NudgeContext::for_milestone("career", "Get promoted", &sample_milestone());
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("\"milestoneTitle\": \"Draft chapter one\""));
        assert!(prompt.contains("\"dueDate\": \"2026-04-14\""));
        assert!(!prompt.contains("personalitySummary"));
    }

    #[test]
    fn fallback_feedback_summary_collapses_and_truncates() {
        assert_eq!(fallback_feedback_summary("  too\n\n pushy  "), "too pushy");
        let long = "word ".repeat(100);
        let summary = fallback_feedback_summary(&long);
        assert!(summary.chars().count() <= MAX_FEEDBACK_SUMMARY_LEN);
        assert!(summary.ends_with("..."));
    }
}

use std::sync::Arc;

use chrono::Utc;
use stepiva_assistant::{AssistantClient, AssistantError};
use stepiva_core::notification::{NotificationMeta, NotificationType};
use stepiva_core::nudge::{
    build_prompt, fallback_nudge, no_plan_reminder_text, NudgeContext, MAX_HISTORICAL_FEEDBACK,
};
use stepiva_core::plan::Milestone;
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::notification::{CreateNotification, Notification};
use stepiva_db::models::plan::Plan;
use stepiva_db::repositories::{NotificationRepo, UserRepo};
use stepiva_db::DbPool;
use stepiva_events::{UsageBus, UsageEvent};

/// Token usage purposes recorded on the usage bus.
pub const PURPOSE_MILESTONE_NUDGE: &str = "milestone_nudge";
pub const PURPOSE_PLAN_DRAFT: &str = "plan_draft";
pub const PURPOSE_FEEDBACK_SUMMARY: &str = "feedback_summary";
pub const PURPOSE_ENNEAGRAM_SUMMARY: &str = "enneagram_summary";

/// Nudge text and whether it came from the template instead of the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedNudge {
    pub text: String,
    pub used_fallback: bool,
}

/// Writes nudges and stores them as notifications.
#[derive(Clone)]
pub struct NudgeService {
    pool: DbPool,
    assistant: Option<Arc<AssistantClient>>,
    usage_bus: Arc<UsageBus>,
}

impl NudgeService {
    pub fn new(
        pool: DbPool,
        assistant: Option<Arc<AssistantClient>>,
        usage_bus: Arc<UsageBus>,
    ) -> Self {
        Self {
            pool,
            assistant,
            usage_bus,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Send `prompt` to the assistant and record the tokens it used.
    ///
    /// `Ok(None)` means no assistant is configured.
    pub async fn ask(
        &self,
        purpose: &str,
        user_id: Option<&str>,
        prompt: &str,
    ) -> Result<Option<String>, AssistantError> {
        let Some(assistant) = &self.assistant else {
            return Ok(None);
        };

        let reply = assistant.ask(prompt).await?;
        if let Some(usage) = reply.usage {
            self.usage_bus.publish(UsageEvent::tokens(
                user_id.map(str::to_string),
                purpose,
                &reply.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens,
            ));
        }
        tracing::debug!(purpose, run_id = %reply.run_id, "Assistant replied");
        Ok(Some(reply.text))
    }

    /// Record `count` storage operations on `collection`.
    pub fn track_store(&self, operation: StoreOperation, collection: &str, count: usize) {
        if count > 0 {
            self.usage_bus
                .publish(UsageEvent::store(operation, collection, count as i64));
        }
    }

    /// Nudge text for `ctx`, falling back to the template when the assistant
    /// is missing, fails, times out or returns nothing.
    pub async fn generate(&self, ctx: &NudgeContext, user_id: &str) -> GeneratedNudge {
        match self
            .ask(PURPOSE_MILESTONE_NUDGE, Some(user_id), &build_prompt(ctx))
            .await
        {
            Ok(Some(text)) => GeneratedNudge {
                text,
                used_fallback: false,
            },
            Ok(None) => GeneratedNudge {
                text: fallback_nudge(ctx),
                used_fallback: true,
            },
            Err(e) => {
                tracing::warn!(
                    user_id,
                    milestone = %ctx.milestone_title,
                    error = %e,
                    "Assistant nudge failed, using fallback"
                );
                GeneratedNudge {
                    text: fallback_nudge(ctx),
                    used_fallback: true,
                }
            }
        }
    }

    /// Full nudge context: plan data plus the user's personality profile and
    /// recent feedback summaries.
    pub async fn load_context(
        &self,
        plan: &Plan,
        milestone: &Milestone,
    ) -> Result<NudgeContext, sqlx::Error> {
        let user = UserRepo::find_by_id(&self.pool, &plan.user_id).await?;
        self.track_store(StoreOperation::Read, "users", 1);

        let feedback = NotificationRepo::recent_feedback_summaries(
            &self.pool,
            &plan.user_id,
            MAX_HISTORICAL_FEEDBACK as i64,
        )
        .await?;
        self.track_store(StoreOperation::Read, "notifications", feedback.len());

        let result = user.and_then(|u| u.enneagram_result).map(|r| r.0);
        let summary = result.as_ref().map(|r| r.summary.clone());
        let kind = result.as_ref().and_then(|r| r.dominant());

        Ok(NudgeContext::for_milestone(&plan.goal_type, &plan.goal, milestone)
            .with_personality(summary, kind)
            .with_feedback(feedback))
    }

    /// Generate and store a `milestone_reminder` for one milestone.
    ///
    /// A failure to load the personality context degrades to a context built
    /// from the plan alone, so a notification is still written.
    pub async fn create_milestone_nudge(
        &self,
        plan: &Plan,
        milestone: &Milestone,
    ) -> Result<Notification, sqlx::Error> {
        let ctx = match self.load_context(plan, milestone).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(
                    user_id = %plan.user_id,
                    plan_id = plan.id,
                    milestone_id = %milestone.id,
                    error = %e,
                    "Failed to load nudge context, using plan data only"
                );
                NudgeContext::for_milestone(&plan.goal_type, &plan.goal, milestone)
            }
        };

        let nudge = self.generate(&ctx, &plan.user_id).await;
        let kind = NotificationType::MilestoneReminder;
        let notification = NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id: plan.user_id.clone(),
                plan_id: Some(plan.id),
                milestone_id: Some(milestone.id.clone()),
                notification_type: kind,
                prompt: nudge.text,
                used_fallback: nudge.used_fallback,
                notification_meta: NotificationMeta::for_type(kind, Utc::now()),
            },
        )
        .await?;
        self.track_store(StoreOperation::Write, "notifications", 1);

        tracing::info!(
            user_id = %plan.user_id,
            plan_id = plan.id,
            milestone_id = %milestone.id,
            notification_id = notification.id,
            used_fallback = notification.used_fallback,
            "Milestone nudge created"
        );
        Ok(notification)
    }

    /// Store a `no_plan_reminder` for a user who has not created a plan.
    pub async fn create_no_plan_reminder(&self, user_id: &str) -> Result<Notification, sqlx::Error> {
        let kind = NotificationType::NoPlanReminder;
        let notification = NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id: user_id.to_string(),
                plan_id: None,
                milestone_id: None,
                notification_type: kind,
                prompt: no_plan_reminder_text().to_string(),
                used_fallback: true,
                notification_meta: NotificationMeta::for_type(kind, Utc::now()),
            },
        )
        .await?;
        self.track_store(StoreOperation::Write, "notifications", 1);

        tracing::info!(user_id, notification_id = notification.id, "No-plan reminder created");
        Ok(notification)
    }
}

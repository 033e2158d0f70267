use std::sync::Arc;

use chrono::Duration;
use stepiva_core::notification::{NotificationType, NO_PLAN_LOOKBACK_DAYS};
use stepiva_core::plan::Milestone;
use stepiva_core::types::{Date, Timestamp};
use stepiva_core::usage::StoreOperation;
use stepiva_db::models::notification::Notification;
use stepiva_db::models::plan::Plan;
use stepiva_db::repositories::{NotificationRepo, PlanRepo, UserRepo};
use stepiva_events::NotificationDispatcher;

use super::service::NudgeService;

/// Something that should receive a reminder in this pass.
#[derive(Debug, Clone)]
pub enum ReminderCandidate {
    Milestone { plan: Plan, milestone: Milestone },
    NoPlan { user_id: String },
}

/// Outcome of a sequential pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub candidates: usize,
    pub created: usize,
    pub failed: usize,
}

/// Finds due reminders and turns each into one delivered notification.
///
/// Deduplication relies on the lookback query only; two scans that overlap
/// can both pass it.
#[derive(Clone)]
pub struct ReminderScanner {
    nudges: NudgeService,
    dispatcher: Arc<NotificationDispatcher>,
    test_user_id: Option<String>,
}

impl ReminderScanner {
    pub fn new(
        nudges: NudgeService,
        dispatcher: Arc<NotificationDispatcher>,
        test_user_id: Option<String>,
    ) -> Self {
        Self {
            nudges,
            dispatcher,
            test_user_id,
        }
    }

    fn bypasses_dedup(&self, user_id: &str) -> bool {
        self.test_user_id.as_deref() == Some(user_id)
    }

    /// Every reminder due on `today`.
    ///
    /// A milestone qualifies when its plan is active, it is open and its
    /// window contains `today`, and no reminder for it was written within
    /// the plan's lookback window (one day for daily plans, seven for
    /// weekly). Users without any plan qualify for a no-plan reminder once
    /// per week.
    pub async fn find_due(
        &self,
        today: Date,
        now: Timestamp,
    ) -> Result<Vec<ReminderCandidate>, sqlx::Error> {
        let pool = self.nudges.pool();
        let mut candidates = Vec::new();

        let plans = PlanRepo::list_active(pool).await?;
        self.nudges
            .track_store(StoreOperation::Read, "plans", plans.len());

        for plan in plans {
            let since = now - plan.nudge_frequency().lookback();
            let due: Vec<Milestone> = plan
                .milestones
                .0
                .iter()
                .filter(|m| m.is_due_on(today))
                .cloned()
                .collect();

            for milestone in due {
                if !self.bypasses_dedup(&plan.user_id) {
                    let recent = NotificationRepo::exists_for_milestone_since(
                        pool,
                        plan.id,
                        &milestone.id,
                        since,
                    )
                    .await?;
                    self.nudges
                        .track_store(StoreOperation::Read, "notifications", 1);
                    if recent {
                        tracing::debug!(
                            plan_id = plan.id,
                            milestone_id = %milestone.id,
                            "Milestone already nudged in lookback window"
                        );
                        continue;
                    }
                }
                candidates.push(ReminderCandidate::Milestone {
                    plan: plan.clone(),
                    milestone,
                });
            }
        }

        let idle_users = UserRepo::list_without_plans(pool).await?;
        self.nudges
            .track_store(StoreOperation::Read, "users", idle_users.len());
        let since = now - Duration::days(NO_PLAN_LOOKBACK_DAYS);
        for user in idle_users {
            if !self.bypasses_dedup(&user.id) {
                let recent = NotificationRepo::exists_of_type_since(
                    pool,
                    &user.id,
                    NotificationType::NoPlanReminder,
                    since,
                )
                .await?;
                self.nudges
                    .track_store(StoreOperation::Read, "notifications", 1);
                if recent {
                    continue;
                }
            }
            candidates.push(ReminderCandidate::NoPlan { user_id: user.id });
        }

        Ok(candidates)
    }

    /// Write the notification for one candidate and dispatch it.
    pub async fn process(&self, candidate: &ReminderCandidate) -> Result<Notification, sqlx::Error> {
        let notification = match candidate {
            ReminderCandidate::Milestone { plan, milestone } => {
                self.nudges.create_milestone_nudge(plan, milestone).await?
            }
            ReminderCandidate::NoPlan { user_id } => {
                self.nudges.create_no_plan_reminder(user_id).await?
            }
        };
        self.dispatcher.dispatch(&notification).await;
        Ok(notification)
    }

    /// Detach one task per candidate and return how many were queued.
    pub fn spawn(&self, candidates: Vec<ReminderCandidate>) -> usize {
        let queued = candidates.len();
        for candidate in candidates {
            let scanner = self.clone();
            tokio::spawn(async move {
                if let Err(e) = scanner.process(&candidate).await {
                    tracing::error!(error = %e, candidate = ?candidate_label(&candidate), "Reminder task failed");
                }
            });
        }
        queued
    }

    /// Find and process every due reminder in order.
    pub async fn run_pass(&self, today: Date, now: Timestamp) -> Result<ScanReport, sqlx::Error> {
        let candidates = self.find_due(today, now).await?;
        let mut report = ScanReport {
            candidates: candidates.len(),
            ..ScanReport::default()
        };

        for candidate in &candidates {
            match self.process(candidate).await {
                Ok(_) => report.created += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, candidate = ?candidate_label(candidate), "Reminder failed");
                }
            }
        }

        tracing::info!(
            candidates = report.candidates,
            created = report.created,
            failed = report.failed,
            "Reminder pass finished"
        );
        Ok(report)
    }
}

fn candidate_label(candidate: &ReminderCandidate) -> (String, Option<String>) {
    match candidate {
        ReminderCandidate::Milestone { plan, milestone } => {
            (plan.user_id.clone(), Some(milestone.id.clone()))
        }
        ReminderCandidate::NoPlan { user_id } => (user_id.clone(), None),
    }
}

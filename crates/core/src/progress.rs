//! Gamification: experience points, levels and completion streaks.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::Serialize;

use crate::plan::{Milestone, PlanStatus};
use crate::types::Date;

pub const XP_PER_STEP: u64 = 10;
pub const XP_PER_MILESTONE: u64 = 50;
pub const XP_PER_PLAN: u64 = 200;

/// Total XP needed to reach `level` (level 1 starts at zero).
pub fn xp_for_level(level: u32) -> u64 {
    let n = u64::from(level.max(1));
    50 * n * (n - 1)
}

/// Level reached with `xp` points.
pub fn level_for_xp(xp: u64) -> u32 {
    let mut level = 1;
    while xp_for_level(level + 1) <= xp {
        level += 1;
    }
    level
}

/// Minimal view of a plan needed for progress accounting.
pub struct PlanProgressInput<'a> {
    pub status: PlanStatus,
    pub milestones: &'a [Milestone],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub xp: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
    pub completed_steps: u64,
    pub completed_milestones: u64,
    pub completed_plans: u64,
    pub streak_days: u32,
}

/// Aggregate XP, level and streak over all of a user's plans.
pub fn compute_progress(plans: &[PlanProgressInput<'_>], today: Date) -> ProgressSummary {
    let mut completed_steps = 0u64;
    let mut completed_milestones = 0u64;
    let mut completed_plans = 0u64;
    let mut active_days = BTreeSet::new();

    for plan in plans {
        if plan.status == PlanStatus::Completed {
            completed_plans += 1;
        }
        for milestone in plan.milestones {
            if milestone.completed {
                completed_milestones += 1;
            }
            for step in milestone.steps.iter().filter(|s| s.completed) {
                completed_steps += 1;
                if let Some(at) = step.completed_at {
                    active_days.insert(at.date_naive());
                }
            }
        }
    }

    let xp = completed_steps * XP_PER_STEP
        + completed_milestones * XP_PER_MILESTONE
        + completed_plans * XP_PER_PLAN;
    let level = level_for_xp(xp);
    let level_floor = xp_for_level(level);

    ProgressSummary {
        xp,
        level,
        xp_into_level: xp - level_floor,
        xp_for_next_level: xp_for_level(level + 1) - level_floor,
        completed_steps,
        completed_milestones,
        completed_plans,
        streak_days: streak_days(&active_days, today),
    }
}

/// Consecutive active days ending today, or yesterday if nothing was done
/// yet today.
pub fn streak_days(active_days: &BTreeSet<Date>, today: Date) -> u32 {
    let mut cursor = if active_days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while active_days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::plan::{build_milestones, NewMilestone, StepSource};

    fn date(y: i32, m: u32, d: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 100);
        assert_eq!(xp_for_level(3), 300);
        assert_eq!(xp_for_level(4), 600);
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(599), 3);
    }

    #[test]
    fn streak_counts_back_from_today_or_yesterday() {
        let days: BTreeSet<Date> = [date(2026, 5, 8), date(2026, 5, 9), date(2026, 5, 10)].into();
        assert_eq!(streak_days(&days, date(2026, 5, 10)), 3);
        assert_eq!(streak_days(&days, date(2026, 5, 11)), 3);
        assert_eq!(streak_days(&days, date(2026, 5, 12)), 0);
    }

    #[test]
    fn progress_sums_xp_across_plans() {
        let mut milestones = build_milestones(vec![NewMilestone {
            title: "M".into(),
            description: String::new(),
            start_date: date(2026, 5, 1),
            due_date: date(2026, 5, 31),
            blind_spot_tip: None,
            strength_hook: None,
        }])
        .unwrap();
        let done_at = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        for title in ["a", "b", "c"] {
            let id = milestones[0]
                .add_step(title, StepSource::User, None, done_at)
                .unwrap()
                .id
                .clone();
            milestones[0].set_step_completed(&id, true, done_at).unwrap();
        }
        milestones[0].set_completed(true, done_at);

        let plans = [
            PlanProgressInput { status: PlanStatus::Completed, milestones: &milestones },
            PlanProgressInput { status: PlanStatus::Active, milestones: &[] },
        ];
        let summary = compute_progress(&plans, date(2026, 5, 10));

        // 3 steps * 10 + 1 milestone * 50 + 1 plan * 200
        assert_eq!(summary.xp, 280);
        assert_eq!(summary.level, 2);
        assert_eq!(summary.xp_into_level, 180);
        assert_eq!(summary.xp_for_next_level, 200);
        assert_eq!(summary.completed_steps, 3);
        assert_eq!(summary.streak_days, 1);
    }
}

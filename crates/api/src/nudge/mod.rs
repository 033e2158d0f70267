//! The milestone reminder pipeline.
//!
//! [`ReminderScanner`] finds milestones that are due and have not been
//! nudged recently, [`NudgeService`] writes the nudge text (assistant or
//! fallback) and stores it as a notification, and the dispatcher from
//! `stepiva_events` delivers it.

mod scanner;
mod service;

pub use scanner::{ReminderCandidate, ReminderScanner, ScanReport};
pub use service::{
    GeneratedNudge, NudgeService, PURPOSE_ENNEAGRAM_SUMMARY, PURPOSE_FEEDBACK_SUMMARY,
    PURPOSE_MILESTONE_NUDGE, PURPOSE_PLAN_DRAFT,
};

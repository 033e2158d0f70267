//! Domain logic for the Stepiva goal-coaching backend.
//!
//! This crate has no I/O dependencies: everything here is pure functions and
//! plain data so the API, persistence and delivery layers can share it.

pub mod enneagram;
pub mod error;
pub mod notification;
pub mod nudge;
pub mod plan;
pub mod plan_draft;
pub mod progress;
pub mod roles;
pub mod types;
pub mod usage;

//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`cron::CronAuth`] -- guards the scheduler-facing reminder trigger.

pub mod auth;
pub mod cron;
pub mod rbac;

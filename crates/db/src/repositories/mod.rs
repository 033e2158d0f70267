//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` (or a transaction connection) as the first argument.

pub mod notification_repo;
pub mod plan_repo;
pub mod push_subscription_repo;
pub mod usage_repo;
pub mod user_repo;

pub use notification_repo::NotificationRepo;
pub use plan_repo::PlanRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use usage_repo::UsageRepo;
pub use user_repo::UserRepo;

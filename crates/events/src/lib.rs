//! Stepiva usage bus and notification delivery.
//!
//! - [`UsageBus`]: in-process publish/subscribe hub for cost-accounting
//!   events, backed by `tokio::sync::broadcast`.
//! - [`UsagePersistence`]: background service that writes every usage
//!   event to the database.
//! - [`delivery`]: external channels (email, Web Push).
//! - [`NotificationDispatcher`]: fans a stored notification out to the
//!   channels a user has enabled.

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod persistence;

pub use bus::{UsageBus, UsageEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::push::{PushConfig, PushDelivery};
pub use dispatcher::NotificationDispatcher;
pub use persistence::UsagePersistence;

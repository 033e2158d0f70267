use std::sync::Arc;

use stepiva_assistant::AssistantClient;
use stepiva_core::usage::StoreOperation;
use stepiva_events::{NotificationDispatcher, UsageBus, UsageEvent};

use crate::config::ServerConfig;
use crate::nudge::{NudgeService, ReminderScanner};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: stepiva_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// `None` when no OpenAI credentials are configured; every AI feature
    /// then uses its deterministic fallback.
    pub assistant: Option<Arc<AssistantClient>>,
    /// Cost-accounting events, drained by `UsagePersistence`.
    pub usage_bus: Arc<UsageBus>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    /// Record `count` storage operations on `collection` for cost accounting.
    pub fn track_store(&self, operation: StoreOperation, collection: &str, count: usize) {
        if count > 0 {
            self.usage_bus
                .publish(UsageEvent::store(operation, collection, count as i64));
        }
    }

    pub fn nudges(&self) -> NudgeService {
        NudgeService::new(
            self.pool.clone(),
            self.assistant.clone(),
            Arc::clone(&self.usage_bus),
        )
    }

    pub fn reminder_scanner(&self) -> ReminderScanner {
        ReminderScanner::new(
            self.nudges(),
            Arc::clone(&self.dispatcher),
            self.config.reminder_test_user_id.clone(),
        )
    }
}

//! In-process usage bus backed by a `tokio::sync::broadcast` channel.
//!
//! Request handlers and background tasks publish [`UsageEvent`]s without
//! waiting on the database; [`UsagePersistence`](crate::UsagePersistence)
//! drains the channel. Share the bus via `Arc<UsageBus>`.

use chrono::{DateTime, Utc};
use stepiva_core::types::UserId;
use stepiva_core::usage::{store_cost_usd, token_cost_usd, StoreOperation};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// UsageEvent
// ---------------------------------------------------------------------------

/// One billable operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageEvent {
    /// An assistant run finished and reported token counts.
    Tokens {
        user_id: Option<UserId>,
        /// What the run was for, e.g. `"milestone_nudge"`.
        purpose: String,
        model: String,
        prompt_tokens: i64,
        completion_tokens: i64,
        total_tokens: i64,
        cost_usd: f64,
        timestamp: DateTime<Utc>,
    },
    /// A batch of storage operations against one table.
    Store {
        operation: StoreOperation,
        collection: String,
        count: i64,
        cost_usd: f64,
        timestamp: DateTime<Utc>,
    },
}

impl UsageEvent {
    /// Token usage event with its cost priced from `model`.
    pub fn tokens(
        user_id: Option<UserId>,
        purpose: impl Into<String>,
        model: impl Into<String>,
        prompt_tokens: i64,
        completion_tokens: i64,
        total_tokens: i64,
    ) -> Self {
        let model = model.into();
        let cost_usd = token_cost_usd(&model, prompt_tokens, completion_tokens);
        UsageEvent::Tokens {
            user_id,
            purpose: purpose.into(),
            model,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            cost_usd,
            timestamp: Utc::now(),
        }
    }

    /// Storage usage event with its cost priced from `operation`.
    pub fn store(operation: StoreOperation, collection: impl Into<String>, count: i64) -> Self {
        UsageEvent::Store {
            operation,
            collection: collection.into(),
            count,
            cost_usd: store_cost_usd(operation, count),
            timestamp: Utc::now(),
        }
    }

    pub fn cost_usd(&self) -> f64 {
        match self {
            UsageEvent::Tokens { cost_usd, .. } | UsageEvent::Store { cost_usd, .. } => *cost_usd,
        }
    }
}

// ---------------------------------------------------------------------------
// UsageBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus for [`UsageEvent`]s.
///
/// When the buffer is full the oldest events are dropped and slow receivers
/// observe `RecvError::Lagged`.
pub struct UsageBus {
    sender: broadcast::Sender<UsageEvent>,
}

impl UsageBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody
    /// is listening.
    pub fn publish(&self, event: UsageEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UsageEvent> {
        self.sender.subscribe()
    }
}

impl Default for UsageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

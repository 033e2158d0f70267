//! Durable usage persistence service.
//!
//! [`UsagePersistence`] drains the [`UsageBus`](crate::bus::UsageBus) and
//! writes each event to `token_usage` or `store_usage`. It exits when the
//! bus is dropped.

use stepiva_core::types::DbId;
use stepiva_db::models::usage::{CreateStoreUsage, CreateTokenUsage};
use stepiva_db::repositories::UsageRepo;
use stepiva_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::UsageEvent;

/// Background service that persists usage events.
pub struct UsagePersistence;

impl UsagePersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<UsageEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, event).await {
                        tracing::error!(error = %e, "Failed to persist usage event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Usage persistence lagged, some usage was not recorded");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Usage bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: UsageEvent) -> Result<DbId, sqlx::Error> {
        match event {
            UsageEvent::Tokens {
                user_id,
                purpose,
                model,
                prompt_tokens,
                completion_tokens,
                total_tokens,
                cost_usd,
                ..
            } => {
                UsageRepo::insert_token_usage(
                    pool,
                    &CreateTokenUsage {
                        user_id,
                        purpose,
                        model,
                        prompt_tokens,
                        completion_tokens,
                        total_tokens,
                        cost_usd,
                    },
                )
                .await
            }
            UsageEvent::Store {
                operation,
                collection,
                count,
                cost_usd,
                ..
            } => {
                UsageRepo::insert_store_usage(
                    pool,
                    &CreateStoreUsage {
                        operation,
                        collection,
                        count,
                        cost_usd,
                    },
                )
                .await
            }
        }
    }
}

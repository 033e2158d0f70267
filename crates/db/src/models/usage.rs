//! Cost-accounting records and aggregates.

use serde::Serialize;
use sqlx::FromRow;
use stepiva_core::types::{Timestamp, UserId};
use stepiva_core::usage::StoreOperation;

/// Insert DTO for `token_usage`.
#[derive(Debug, Clone)]
pub struct CreateTokenUsage {
    pub user_id: Option<UserId>,
    pub purpose: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
}

/// Insert DTO for `store_usage`.
#[derive(Debug, Clone)]
pub struct CreateStoreUsage {
    pub operation: StoreOperation,
    pub collection: String,
    pub count: i64,
    pub cost_usd: f64,
}

/// Token totals grouped by model.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageTotal {
    pub model: String,
    pub runs: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
}

/// Storage operation totals grouped by operation and collection.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUsageTotal {
    pub operation: String,
    pub collection: String,
    pub count: i64,
    pub cost_usd: f64,
}

/// Everything the usage dashboard shows for one window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub since: Timestamp,
    pub tokens: Vec<TokenUsageTotal>,
    pub store: Vec<StoreUsageTotal>,
    pub total_cost_usd: f64,
}

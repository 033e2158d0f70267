//! Repository for the append-only `token_usage` and `store_usage` tables.

use sqlx::PgPool;
use stepiva_core::types::{DbId, Timestamp};

use crate::models::usage::{
    CreateStoreUsage, CreateTokenUsage, StoreUsageTotal, TokenUsageTotal, UsageSummary,
};

pub struct UsageRepo;

impl UsageRepo {
    pub async fn insert_token_usage(
        pool: &PgPool,
        input: &CreateTokenUsage,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO token_usage \
                (user_id, purpose, model, prompt_tokens, completion_tokens, total_tokens, cost_usd) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(&input.user_id)
        .bind(&input.purpose)
        .bind(&input.model)
        .bind(input.prompt_tokens)
        .bind(input.completion_tokens)
        .bind(input.total_tokens)
        .bind(input.cost_usd)
        .fetch_one(pool)
        .await
    }

    pub async fn insert_store_usage(
        pool: &PgPool,
        input: &CreateStoreUsage,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO store_usage (operation, collection, count, cost_usd) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(input.operation.as_str())
        .bind(&input.collection)
        .bind(input.count)
        .bind(input.cost_usd)
        .fetch_one(pool)
        .await
    }

    pub async fn token_totals_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<TokenUsageTotal>, sqlx::Error> {
        sqlx::query_as::<_, TokenUsageTotal>(
            "SELECT model, \
                    COUNT(*) AS runs, \
                    SUM(prompt_tokens)::BIGINT AS prompt_tokens, \
                    SUM(completion_tokens)::BIGINT AS completion_tokens, \
                    SUM(total_tokens)::BIGINT AS total_tokens, \
                    SUM(cost_usd) AS cost_usd \
             FROM token_usage \
             WHERE created_at >= $1 \
             GROUP BY model \
             ORDER BY model",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    pub async fn store_totals_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<StoreUsageTotal>, sqlx::Error> {
        sqlx::query_as::<_, StoreUsageTotal>(
            "SELECT operation, collection, \
                    SUM(count)::BIGINT AS count, \
                    SUM(cost_usd) AS cost_usd \
             FROM store_usage \
             WHERE created_at >= $1 \
             GROUP BY operation, collection \
             ORDER BY operation, collection",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Token and storage totals with a combined cost since `since`.
    pub async fn summarize_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<UsageSummary, sqlx::Error> {
        let tokens = Self::token_totals_since(pool, since).await?;
        let store = Self::store_totals_since(pool, since).await?;
        let total_cost_usd = tokens.iter().map(|t| t.cost_usd).sum::<f64>()
            + store.iter().map(|s| s.cost_usd).sum::<f64>();
        Ok(UsageSummary {
            since,
            tokens,
            store,
            total_cost_usd,
        })
    }
}

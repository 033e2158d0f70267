//! Cost accounting for assistant tokens and storage operations.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Price in USD per one million tokens, as `(input, output)`.
fn token_prices(model: &str) -> (f64, f64) {
    // Longest prefixes first so "gpt-4o-mini" is not priced as "gpt-4o".
    const PRICES: [(&str, f64, f64); 4] = [
        ("gpt-4o-mini", 0.15, 0.60),
        ("gpt-4o", 2.50, 10.00),
        ("gpt-4-turbo", 10.00, 30.00),
        ("gpt-3.5-turbo", 0.50, 1.50),
    ];
    PRICES
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((2.50, 10.00))
}

/// Estimated USD cost of one assistant run.
pub fn token_cost_usd(model: &str, prompt_tokens: i64, completion_tokens: i64) -> f64 {
    let (input, output) = token_prices(model);
    (prompt_tokens.max(0) as f64 * input + completion_tokens.max(0) as f64 * output) / 1_000_000.0
}

/// Kind of storage operation being accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Read,
    Write,
    Delete,
}

impl StoreOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOperation::Read => "read",
            StoreOperation::Write => "write",
            StoreOperation::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "read" => Ok(StoreOperation::Read),
            "write" => Ok(StoreOperation::Write),
            "delete" => Ok(StoreOperation::Delete),
            other => Err(CoreError::Validation(format!(
                "Unknown store operation '{other}'"
            ))),
        }
    }

    /// USD per 100k operations.
    fn price_per_100k(self) -> f64 {
        match self {
            StoreOperation::Read => 0.06,
            StoreOperation::Write => 0.18,
            StoreOperation::Delete => 0.02,
        }
    }
}

/// Estimated USD cost of `count` operations of kind `op`.
pub fn store_cost_usd(op: StoreOperation, count: i64) -> f64 {
    count.max(0) as f64 * op.price_per_100k() / 100_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn mini_model_is_not_priced_as_full_model() {
        assert!(approx(token_cost_usd("gpt-4o-mini", 1_000_000, 0), 0.15));
        assert!(approx(token_cost_usd("gpt-4o-2024-08-06", 1_000_000, 0), 2.50));
    }

    #[test]
    fn unknown_model_uses_default_price() {
        assert!(approx(token_cost_usd("o9-preview", 0, 1_000_000), 10.00));
    }

    #[test]
    fn negative_counts_cost_nothing() {
        assert_eq!(token_cost_usd("gpt-4o", -5, -5), 0.0);
        assert_eq!(store_cost_usd(StoreOperation::Write, -1), 0.0);
    }

    #[test]
    fn store_costs() {
        assert!(approx(store_cost_usd(StoreOperation::Read, 100_000), 0.06));
        assert!(approx(store_cost_usd(StoreOperation::Write, 50_000), 0.09));
        assert_eq!(StoreOperation::parse("delete").unwrap(), StoreOperation::Delete);
        assert!(StoreOperation::parse("scan").is_err());
    }
}

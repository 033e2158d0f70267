//! Assistant configuration loaded from environment variables.

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Connection and polling settings for the assistant.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub assistant_id: String,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model name used for cost accounting when a run does not report one.
    pub model: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl AssistantConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when `OPENAI_API_KEY` or `OPENAI_ASSISTANT_ID` is
    /// unset or empty, which disables AI features in favour of the
    /// deterministic fallbacks.
    ///
    /// | Env Var                    | Default                     |
    /// |----------------------------|-----------------------------|
    /// | `OPENAI_API_KEY`           | (required)                  |
    /// | `OPENAI_ASSISTANT_ID`      | (required)                  |
    /// | `OPENAI_BASE_URL`          | `https://api.openai.com/v1` |
    /// | `OPENAI_MODEL`             | `gpt-4o-mini`               |
    /// | `OPENAI_POLL_INTERVAL_MS`  | `1000`                      |
    /// | `OPENAI_MAX_POLL_ATTEMPTS` | `30`                        |
    pub fn from_env() -> Option<Self> {
        let api_key = non_empty_var("OPENAI_API_KEY")?;
        let assistant_id = match non_empty_var("OPENAI_ASSISTANT_ID") {
            Some(id) => id,
            None => {
                tracing::warn!("OPENAI_API_KEY is set but OPENAI_ASSISTANT_ID is not; AI disabled");
                return None;
            }
        };

        let base_url = non_empty_var("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = non_empty_var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let poll_interval_ms: u64 = std::env::var("OPENAI_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let max_poll_attempts: u32 = std::env::var("OPENAI_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);

        Some(Self {
            api_key,
            assistant_id,
            base_url,
            model,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_poll_attempts,
        })
    }

    /// Config pointing at an arbitrary base URL with default polling.
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

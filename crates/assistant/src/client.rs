//! HTTP client for the Assistants v2 endpoints.
//!
//! One prompt maps to one fresh thread: the user message is added, a run is
//! started against the configured assistant, and the run is polled until it
//! reaches a terminal state.

use serde::de::DeserializeOwned;

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::types::{MessageList, Run, RunStatus, RunUsage, Thread};

/// Completed assistant answer for a single prompt.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    pub usage: Option<RunUsage>,
    /// Model reported by the run, or the configured model.
    pub model: String,
    pub thread_id: String,
    pub run_id: String,
}

/// Client bound to one assistant.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Send `content` as a user message and wait for the assistant's reply.
    pub async fn ask(&self, content: &str) -> Result<AssistantReply, AssistantError> {
        let thread = self.create_thread().await?;
        self.add_message(&thread.id, content).await?;
        let run = self.create_run(&thread.id).await?;
        let run = self.wait_for_run(&thread.id, run).await?;

        let messages = self.list_messages(&thread.id).await?;
        let text = messages
            .data
            .iter()
            .filter(|m| m.role == "assistant")
            .find_map(|m| m.text())
            .ok_or(AssistantError::EmptyResponse)?;

        Ok(AssistantReply {
            text,
            usage: run.usage,
            model: run.model.unwrap_or_else(|| self.config.model.clone()),
            thread_id: thread.id,
            run_id: run.id,
        })
    }

    /// `POST /threads`
    pub async fn create_thread(&self) -> Result<Thread, AssistantError> {
        let response = self
            .request(reqwest::Method::POST, "/threads")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /threads/{thread_id}/messages`
    pub async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/threads/{thread_id}/messages"))
            .json(&serde_json::json!({ "role": "user", "content": content }))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// `POST /threads/{thread_id}/runs`
    pub async fn create_run(&self, thread_id: &str) -> Result<Run, AssistantError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/threads/{thread_id}/runs"))
            .json(&serde_json::json!({ "assistant_id": self.config.assistant_id }))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /threads/{thread_id}/runs/{run_id}`
    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/threads/{thread_id}/runs/{run_id}"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /threads/{thread_id}/messages`, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> Result<MessageList, AssistantError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/threads/{thread_id}/messages"))
            .query(&[("order", "desc"), ("limit", "20")])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    async fn wait_for_run(&self, thread_id: &str, mut run: Run) -> Result<Run, AssistantError> {
        let max_attempts = self.config.max_poll_attempts;
        for attempt in 1..=max_attempts {
            if !run.status.is_pending() {
                break;
            }
            tokio::time::sleep(self.config.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            tracing::trace!(run_id = %run.id, attempt, status = ?run.status, "Polled assistant run");
        }

        match run.status {
            RunStatus::Completed => Ok(run),
            status if status.is_pending() => Err(AssistantError::Timeout {
                attempts: max_attempts,
            }),
            status => Err(AssistantError::RunFailed { status }),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AssistantError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AssistantError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AssistantError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

use crate::types::RunStatus;

/// Errors from the assistant REST layer.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Assistant API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The run reached a terminal state other than `completed`.
    #[error("Assistant run ended with status {status:?}")]
    RunFailed { status: RunStatus },

    /// The run was still in progress after the last poll.
    #[error("Assistant run did not finish after {attempts} polls")]
    Timeout { attempts: u32 },

    /// The run completed but produced no assistant text.
    #[error("Assistant returned no text")]
    EmptyResponse,
}

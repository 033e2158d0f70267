//! OpenAI Assistants v2 REST client.
//!
//! Provides configuration loading, typed run/message payloads and a
//! client that drives a single prompt through thread creation, run
//! polling and reply extraction.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{AssistantClient, AssistantReply};
pub use config::AssistantConfig;
pub use error::AssistantError;

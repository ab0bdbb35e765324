//! Hosted language-model integration.
//!
//! The estimation core only needs one capability from the model: turn a
//! conversation transcript into free text containing a feature record.
//! Anything speaking the OpenAI Chat Completions protocol works.

mod openai_chat;
mod provider;

pub use openai_chat::OpenAiChatProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

use std::sync::Arc;

use crate::config::OracleConfig;
use crate::error::LlmError;

/// Create the oracle provider from configuration.
pub fn create_llm_provider(config: &OracleConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!(
        model = %config.model,
        base_url = %config.base_url,
        "Using OpenAI-compatible chat completions API"
    );
    Ok(Arc::new(OpenAiChatProvider::new(config.clone())?))
}

pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::chat::{ ChatMessage, ToolCallRequest };
use crate::tools::ToolSpec;
use self::openai::ChatCompletionsClient;

/// Connection settings for the chat-completions backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Failure of a remote completion call. The orchestrator never retries:
/// a failed call aborts the turn and nothing from it is appended to the
/// conversation.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion endpoint returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// What the model decided to do with the turn: either answer directly,
/// or request one or more tool invocations first.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    Answer {
        text: String,
    },
    ToolCallsRequested {
        /// Partial text the model produced alongside the calls; often empty.
        assistant_text: String,
        calls: Vec<ToolCallRequest>,
    },
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the full history, with the tool catalog only when tools are
    /// on offer for this call. Purely functional with respect to local
    /// state; the only side effect is the network call itself.
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        tool_choice: Option<&str>
    ) -> Result<CompletionOutcome, UpstreamError>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn CompletionClient>, reqwest::Error> {
    Ok(Arc::new(ChatCompletionsClient::from_config(config)?))
}

use log::{ info, warn };
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::sync::{ mpsc, RwLock };

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::llm::{ new_client, CompletionClient, CompletionOutcome, LlmConfig, UpstreamError };
use crate::models::chat::{ ChatMessage, Conversation };
use crate::models::stream::{ chunk_content, StreamFrame };
use crate::predictor::{ InMemoryModelStore, ModelStore };
use crate::session::{ Session, SessionStore };
use crate::tools::predict::{ run_prediction, PredictHousePriceTool, PredictionReport };
use crate::tools::time::CurrentTimeTool;
use crate::tools::ToolRegistry;

/// One executed tool invocation, echoed back to HTTP callers alongside
/// the final answer.
#[derive(Clone, Debug, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub arguments: String,
    pub result: String,
}

/// Terminal state of a successful turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub session_id: String,
    pub response: String,
    pub tool_calls: Option<Vec<ToolCallRecord>>,
}

#[derive(Debug, ThisError)]
pub enum TurnError {
    #[error(transparent)] Upstream(#[from] UpstreamError),
    /// The stream consumer went away before tool execution began; the
    /// turn was abandoned with only the user message appended.
    #[error("turn cancelled by the caller")] Cancelled,
}

/// The conversational orchestrator. Drives one user turn from input
/// through at most one round of tool calls to a final answer, holding
/// the session's conversation lock for the whole turn.
pub struct Agent {
    chat_client: Arc<dyn CompletionClient>,
    registry: ToolRegistry,
    sessions: SessionStore,
    model_store: Arc<dyn ModelStore>,
    prompt_config: RwLock<Arc<PromptConfig>>,
    prompts_path: Option<String>,
    stream_chunk_size: usize,
}

impl Agent {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_config = LlmConfig {
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            model: args.chat_model.clone(),
            timeout_secs: args.chat_timeout_secs,
        };
        let chat_client = new_client(&llm_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}, Timeout={}s",
            llm_config.model,
            llm_config.base_url,
            llm_config.timeout_secs
        );

        let model_store: Arc<dyn ModelStore> = match &args.model_artifacts_path {
            Some(path) => Arc::new(InMemoryModelStore::from_artifact_file(path)?),
            None => {
                warn!("No model artifacts configured; predictions will report missing models");
                Arc::new(InMemoryModelStore::new())
            }
        };

        let prompt_config = prompt::load_prompts_or_default(&args.prompts_path)?;

        Ok(
            Self::assemble(
                chat_client,
                model_store,
                prompt_config,
                Some(args.prompts_path.clone()),
                args.stream_chunk_size
            )
        )
    }

    /// Constructor-injection variant used by tests to script the
    /// completion backend and model store.
    pub fn from_parts(
        chat_client: Arc<dyn CompletionClient>,
        model_store: Arc<dyn ModelStore>,
        prompt_config: Arc<PromptConfig>,
        stream_chunk_size: usize
    ) -> Self {
        Self::assemble(chat_client, model_store, prompt_config, None, stream_chunk_size)
    }

    fn assemble(
        chat_client: Arc<dyn CompletionClient>,
        model_store: Arc<dyn ModelStore>,
        prompt_config: Arc<PromptConfig>,
        prompts_path: Option<String>,
        stream_chunk_size: usize
    ) -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CurrentTimeTool));
        registry.register(Arc::new(PredictHousePriceTool::new(model_store.clone())));

        Self {
            chat_client,
            registry,
            sessions: SessionStore::new(),
            model_store,
            prompt_config: RwLock::new(prompt_config),
            prompts_path,
            stream_chunk_size,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn stream_chunk_size(&self) -> usize {
        self.stream_chunk_size
    }

    async fn resolve_session(&self, session_id: Option<&str>) -> Arc<Session> {
        let system_prompt = self.prompt_config.read().await.system_prompt.clone();
        self.sessions.resolve_or_create(session_id, &system_prompt).await
    }

    /// One blocking turn: resolve the session, run the state machine,
    /// return the final answer plus any tool-call records.
    pub async fn chat(
        &self,
        session_id: Option<&str>,
        message: &str
    ) -> Result<TurnOutcome, TurnError> {
        let session = self.resolve_session(session_id).await;
        let mut conversation = session.conversation.lock().await;

        let (response, records) = self.run_turn(&mut conversation, message, None).await?;
        Ok(TurnOutcome {
            session_id: session.id.clone(),
            response,
            tool_calls: if records.is_empty() {
                None
            } else {
                Some(records)
            },
        })
    }

    /// Streaming variant: frames are pushed into the returned channel in
    /// protocol order (`session` first; `done` last on success; a single
    /// `error` frame and nothing after it on failure). The receiver is
    /// the turn's only consumer.
    pub fn chat_stream(
        self: &Arc<Self>,
        session_id: Option<String>,
        message: String
    ) -> mpsc::Receiver<StreamFrame> {
        let (tx, rx) = mpsc::channel(32);
        let agent = self.clone();

        tokio::spawn(async move {
            let session = agent.resolve_session(session_id.as_deref()).await;
            if tx.send(StreamFrame::Session { session_id: session.id.clone() }).await.is_err() {
                return;
            }

            let mut conversation = session.conversation.lock().await;
            match agent.run_turn(&mut conversation, &message, Some(&tx)).await {
                Ok((answer, _records)) => {
                    for chunk in chunk_content(&answer, agent.stream_chunk_size) {
                        if tx.send(StreamFrame::Content { content: chunk }).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(StreamFrame::Done).await;
                }
                Err(TurnError::Cancelled) => {
                    info!("Stream consumer for session {} disconnected; turn abandoned", session.id);
                }
                Err(e) => {
                    let _ = tx.send(StreamFrame::Error { error: e.to_string() }).await;
                }
            }
        });

        rx
    }

    /// The turn state machine. Appends to the conversation only after
    /// the corresponding upstream call succeeded, so a failed call
    /// leaves the history exactly as that call found it.
    async fn run_turn(
        &self,
        conversation: &mut Conversation,
        message: &str,
        frames: Option<&mpsc::Sender<StreamFrame>>
    ) -> Result<(String, Vec<ToolCallRecord>), TurnError> {
        conversation.push(ChatMessage::user(message));

        let specs = self.registry.specs();
        let outcome = self.chat_client.complete(
            conversation.messages(),
            Some(&specs),
            Some("auto")
        ).await?;

        let (assistant_text, calls) = match outcome {
            CompletionOutcome::Answer { text } => {
                conversation.push(ChatMessage::assistant(text.clone()));
                return Ok((text, Vec::new()));
            }
            CompletionOutcome::ToolCallsRequested { assistant_text, calls } =>
                (assistant_text, calls),
        };

        // Last safe abort point: nothing past the user message is in the
        // history yet. Once tool execution starts the turn runs to its
        // terminal state even without a consumer.
        if frames.is_some_and(|tx| tx.is_closed()) {
            return Err(TurnError::Cancelled);
        }

        if let Some(tx) = frames {
            let _ = tx.send(StreamFrame::ToolCall {
                message: "Invoking tools...".to_string(),
            }).await;
        }

        info!("Model requested {} tool call(s)", calls.len());
        conversation.push(ChatMessage::assistant_with_tool_calls(assistant_text, calls.clone()));

        let mut records = Vec::with_capacity(calls.len());
        for call in &calls {
            let name = &call.function.name;
            if let Some(tx) = frames {
                let _ = tx.send(StreamFrame::ToolExecuting { tool_name: name.clone() }).await;
            }

            let result = self.registry.dispatch(name, &call.function.arguments).await;
            conversation.push(ChatMessage::tool(&call.id, name, &result));
            records.push(ToolCallRecord {
                tool_name: name.clone(),
                arguments: call.function.arguments.clone(),
                result,
            });
        }

        // Second and final upstream call: no tool catalog is offered, so
        // exactly one round of tool calls is possible per turn.
        let final_outcome = self.chat_client.complete(conversation.messages(), None, None).await?;
        let answer = match final_outcome {
            CompletionOutcome::Answer { text } => text,
            CompletionOutcome::ToolCallsRequested { assistant_text, .. } => {
                warn!("Model requested tools on the final call; ignoring the requests");
                assistant_text
            }
        };

        conversation.push(ChatMessage::assistant(answer.clone()));
        Ok((answer, records))
    }

    /// Direct prediction, bypassing the conversational loop.
    pub async fn predict_direct(
        &self,
        house_info: &JsonValue,
        model_ids: &[i64]
    ) -> PredictionReport {
        run_prediction(&self.model_store, house_info, model_ids).await
    }

    /// Reloads the prompt file when it changed on disk. Returns whether
    /// a reload happened. New sessions pick up the new prompt; existing
    /// conversations keep the system message they were created with.
    pub async fn reload_prompts(&self) -> Result<bool, prompt::PromptError> {
        let Some(path) = &self.prompts_path else {
            return Ok(false);
        };

        let current = self.prompt_config.read().await.clone();
        match prompt::reload_prompts_if_changed(path, &current)? {
            Some(new_config) => {
                *self.prompt_config.write().await = new_config;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{ Arc, Mutex };

use estate_agent::agent::Agent;
use estate_agent::config::prompt::PromptConfig;
use estate_agent::llm::{ CompletionClient, CompletionOutcome, UpstreamError };
use estate_agent::models::chat::{ ChatMessage, Role, ToolCallFunction, ToolCallRequest };
use estate_agent::predictor::{ BaselinePredictor, InMemoryModelStore, ModelStore };
use estate_agent::tools::ToolSpec;

/// What one upstream call looked like, for asserting on the protocol
/// the orchestrator speaks.
pub struct RecordedCall {
    pub offered_tools: bool,
    pub roles: Vec<Role>,
}

/// Completion client that replays a fixed script of outcomes and records
/// every call it receives.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<CompletionOutcome, UpstreamError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<CompletionOutcome, UpstreamError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        _tool_choice: Option<&str>
    ) -> Result<CompletionOutcome, UpstreamError> {
        self.calls.lock().unwrap().push(RecordedCall {
            offered_tools: tools.is_some(),
            roles: history
                .iter()
                .map(|m| m.role)
                .collect(),
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(||
                Err(UpstreamError::MalformedResponse("scripted client exhausted".to_string()))
            )
    }
}

pub fn answer(text: &str) -> Result<CompletionOutcome, UpstreamError> {
    Ok(CompletionOutcome::Answer { text: text.to_string() })
}

pub fn tool_calls_requested(
    calls: Vec<ToolCallRequest>
) -> Result<CompletionOutcome, UpstreamError> {
    Ok(CompletionOutcome::ToolCallsRequested {
        assistant_text: String::new(),
        calls,
    })
}

pub fn upstream_failure() -> Result<CompletionOutcome, UpstreamError> {
    Err(UpstreamError::Status {
        status: 503,
        body: "upstream unavailable".to_string(),
    })
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: ToolCallFunction {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// Two baseline models matching the canonical weighting example:
/// ids 1 and 2 with data counts 10 and 30 and unit prices 100 and 200,
/// so the fused unit price over both is 175.
pub async fn seeded_model_store() -> Arc<dyn ModelStore> {
    let store = InMemoryModelStore::new();
    store.insert(1, Arc::new(BaselinePredictor::new("district-a", 10, 100.0))).await;
    store.insert(2, Arc::new(BaselinePredictor::new("district-b", 30, 200.0))).await;
    Arc::new(store)
}

pub fn agent_with(
    script: Vec<Result<CompletionOutcome, UpstreamError>>,
    model_store: Arc<dyn ModelStore>
) -> (Arc<Agent>, Arc<ScriptedClient>) {
    let client = Arc::new(ScriptedClient::new(script));
    let agent = Agent::from_parts(
        client.clone(),
        model_store,
        Arc::new(PromptConfig::default()),
        20
    );
    (Arc::new(agent), client)
}

pub mod time;
pub mod predict;

use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use serde_json::{ Map, Value as JsonValue };
use std::sync::Arc;
use thiserror::Error;

/// Tool description shown to the model, in the chat-completions
/// function-calling shape.
#[derive(Clone, Debug, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub spec_type: String,
    pub function: FunctionSpec,
}

#[derive(Clone, Debug, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object.
    pub parameters: JsonValue,
}

impl ToolSpec {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonValue
    ) -> Self {
        Self {
            spec_type: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Execution(String),
}

/// A named function the model may request. Implementations decode their
/// own typed argument struct from the already-parsed argument object, so
/// shape errors surface as a `ToolError` message rather than a loose
/// keyword-binding failure.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: JsonValue) -> Result<String, ToolError>;
}

/// Name-to-handler registry. Registration order is preserved so the
/// catalog offered to the model is stable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.get(tool.name()).is_some() {
            warn!("Tool '{}' registered twice; keeping the first registration", tool.name());
            return;
        }
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// The full catalog, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| t.spec())
            .collect()
    }

    /// Executes one requested call and always produces a textual result.
    /// Unknown names and handler failures become conversation-visible
    /// text the model can react to; a malformed argument payload falls
    /// back to an empty argument object rather than failing the round.
    pub async fn dispatch(&self, name: &str, arguments_json: &str) -> String {
        let Some(tool) = self.get(name) else {
            warn!("Model requested unknown tool '{}'", name);
            return format!("unknown tool: {}", name);
        };

        let args = match serde_json::from_str::<JsonValue>(arguments_json) {
            Ok(value) if value.is_object() => value,
            Ok(_) | Err(_) => {
                warn!("Arguments for tool '{}' were not a JSON object; using empty set", name);
                JsonValue::Object(Map::new())
            }
        };

        match tool.call(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                e.to_string()
            }
        }
    }
}

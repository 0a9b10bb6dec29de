use serde::{ Serialize, Deserialize };

/// Message roles as they appear on the chat-completions wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tool invocation requested by the model. Kept in the OpenAI wire
/// shape so it can be stored in history and echoed back verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    pub arguments: String,
}

/// A single conversation message, serializable directly into the
/// chat-completions request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Set only on `Role::Tool` messages: the id of the request answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name, set alongside `tool_call_id` on tool messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying the tool calls the model requested.
    /// Content may be empty when the model produced no partial text.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        calls: Vec<ToolCallRequest>
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool result message, tagged with the id of the originating request.
    pub fn tool(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(tool_name.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// Ordered, append-only message history. There is deliberately no API
/// for removing or reordering messages: during a turn the history only
/// grows, and a failed upstream call appends nothing.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    /// A conversation seeded with its system prompt. The system message
    /// is always first and is filtered out of user-facing views.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self { messages: vec![ChatMessage::system(prompt)] }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The user/assistant exchange as shown to end users; system and
    /// tool messages never leave the server.
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_message_carries_call_id_and_name() {
        let msg = ChatMessage::tool("call_1", "get_current_time", "12:00");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.name.as_deref(), Some("get_current_time"));
    }

    #[test]
    fn serializes_in_wire_shape() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hello" }));

        let call = ToolCallRequest {
            id: "call_9".into(),
            call_type: "function".into(),
            function: ToolCallFunction {
                name: "get_current_time".into(),
                arguments: "{}".into(),
            },
        };
        let msg = ChatMessage::assistant_with_tool_calls("", vec![call]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "get_current_time");
    }

    #[test]
    fn visible_messages_excludes_system_and_tool() {
        let mut conv = Conversation::with_system_prompt("you are a helpful assistant");
        conv.push(ChatMessage::user("hi"));
        conv.push(ChatMessage::tool("call_1", "get_current_time", "12:00"));
        conv.push(ChatMessage::assistant("hello"));

        let roles: Vec<Role> = conv.visible_messages().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }
}

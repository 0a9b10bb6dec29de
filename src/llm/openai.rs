use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ CompletionClient, CompletionOutcome, LlmConfig, UpstreamError };
use crate::models::chat::{ ChatMessage, ToolCallRequest };
use crate::tools::ToolSpec;

/// Client for an OpenAI-compatible `/chat/completions` endpoint. This is
/// a fixed external protocol: the request carries the full message
/// history plus an optional tool catalog, the response carries either
/// content or requested tool calls.
pub struct ChatCompletionsClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallRequest>>,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout_secs: u64
    ) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().timeout(Duration::from_secs(timeout_secs)).build()?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        if config.api_key.is_none() {
            warn!("No chat API key configured; the completion endpoint may reject requests");
        }
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.timeout_secs
        )
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        tool_choice: Option<&str>
    ) -> Result<CompletionOutcome, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatCompletionsRequest {
            model: &self.model,
            messages: history,
            tools,
            tool_choice,
        };

        debug!("POST {} ({} message(s), tools: {})", url, history.len(), tools.is_some());

        let mut request = self.http.post(&url).json(&req);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionsResponse = resp
            .json().await
            .map_err(|e| UpstreamError::MalformedResponse(e.to_string()))?;
        let choice = parsed.choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                UpstreamError::MalformedResponse("response contained no choices".to_string())
            })?;

        match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() =>
                Ok(CompletionOutcome::ToolCallsRequested {
                    assistant_text: choice.message.content.unwrap_or_default(),
                    calls,
                }),
            _ =>
                Ok(CompletionOutcome::Answer {
                    text: choice.message.content.unwrap_or_default(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ChatMessage;
    use crate::tools::{ FunctionSpec, ToolSpec };

    #[test]
    fn request_omits_tool_fields_when_absent() {
        let messages = vec![ChatMessage::user("hi")];
        let req = ChatCompletionsRequest {
            model: "qwen-plus",
            messages: &messages,
            tools: None,
            tool_choice: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn request_carries_tool_catalog_when_offered() {
        let messages = vec![ChatMessage::user("hi")];
        let specs = vec![ToolSpec {
            spec_type: "function".into(),
            function: FunctionSpec {
                name: "get_current_time".into(),
                description: "Current local time".into(),
                parameters: serde_json::json!({ "type": "object", "properties": {} }),
            },
        }];
        let req = ChatCompletionsRequest {
            model: "qwen-plus",
            messages: &messages,
            tools: Some(&specs),
            tool_choice: Some("auto"),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["function"]["name"], "get_current_time");
    }

    #[test]
    fn response_with_tool_calls_parses_as_requests() {
        let body =
            r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "get_current_time", "arguments": "{}" }
                    }]
                }
            }]
        }"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(body).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        let calls = choice.message.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "get_current_time");
    }
}

use crate::agent::{ Agent, ToolCallRecord };
use crate::error::ApiError;
use crate::models::chat::Role;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{ Path, State },
    response::sse::{ Event, Sse },
    response::IntoResponse,
    routing::{ get, post },
    Json,
    Router,
};
use chrono::Utc;
use futures::{ Stream, StreamExt };
use log::{ error, info };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{ Any, CorsLayer };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    /// Accepted for wire compatibility; streaming callers use the
    /// dedicated /agent/chat-stream endpoint.
    #[serde(default)]
    #[allow(dead_code)]
    pub stream: bool,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallRecord>>,
    timestamp: String,
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PredictRequest {
    pub house_info: Option<JsonValue>,
    pub model_ids: Option<Vec<i64>>,
}

#[derive(Serialize)]
struct VisibleMessage {
    role: Role,
    content: String,
}

#[derive(Serialize)]
struct SessionView {
    session_id: String,
    messages: Vec<VisibleMessage>,
    created_at: String,
    message_count: usize,
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/agent/chat", post(chat_handler))
        .route("/agent/chat-stream", post(chat_stream_handler))
        .route("/agent/sessions", get(list_sessions_handler))
        .route("/agent/sessions/{id}", get(get_session_handler).delete(delete_session_handler))
        .route("/agent/predict", post(predict_handler))
        .route("/agent/health", get(health_handler))
        .route("/agent/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(state)
}

fn validate_message(message: &str) -> Result<&str, ApiError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("message must not be empty".to_string()));
    }
    Ok(trimmed)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>
) -> Result<Json<ChatResponse>, ApiError> {
    let message = validate_message(&req.message)?;

    let outcome = state.agent
        .chat(req.session_id.as_deref(), message).await
        .map_err(|e| {
            error!("Turn failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(
        Json(ChatResponse {
            session_id: outcome.session_id,
            response: outcome.response,
            tool_calls: outcome.tool_calls,
            timestamp: Utc::now().to_rfc3339(),
            status: "success",
        })
    )
}

async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let message = validate_message(&req.message)?.to_string();

    let rx = state.agent.chat_stream(req.session_id, message);
    let stream = ReceiverStream::new(rx).map(|frame| {
        let event = Event::default()
            .json_data(&frame)
            .unwrap_or_else(|e| {
                error!("Failed to encode stream frame: {}", e);
                Event::default().data("{\"type\":\"error\",\"error\":\"encoding failure\"}")
            });
        Ok(event)
    });

    Ok(Sse::new(stream))
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<SessionView>, ApiError> {
    let session = state.agent
        .sessions()
        .get(&id).await
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", id)))?;

    let conversation = session.conversation.lock().await;
    let messages: Vec<VisibleMessage> = conversation
        .visible_messages()
        .map(|m| VisibleMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();

    Ok(
        Json(SessionView {
            session_id: session.id.clone(),
            message_count: messages.len(),
            messages,
            created_at: session.created_at.to_rfc3339(),
            status: "success",
        })
    )
}

async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<JsonValue>, ApiError> {
    if !state.agent.sessions().delete(&id).await {
        return Err(ApiError::NotFound(format!("session {} not found", id)));
    }

    Ok(
        Json(
            serde_json::json!({
            "message": "session deleted",
            "session_id": id,
            "status": "success",
        })
        )
    )
}

async fn list_sessions_handler(State(state): State<AppState>) -> Json<JsonValue> {
    let sessions = state.agent.sessions().summaries().await;
    Json(
        serde_json::json!({
        "total": sessions.len(),
        "sessions": sessions,
        "status": "success",
    })
    )
}

async fn predict_handler(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>
) -> Result<Json<JsonValue>, ApiError> {
    let house_info = req.house_info
        .filter(|v| v.as_object().map(|o| !o.is_empty()).unwrap_or(false))
        .ok_or_else(|| ApiError::Validation("house_info must be a non-empty object".to_string()))?;
    let model_ids = req.model_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::Validation("model_ids must not be empty".to_string()))?;

    let report = state.agent.predict_direct(&house_info, &model_ids).await;
    Ok(
        Json(
            serde_json::json!({
        "result": report,
        "timestamp": Utc::now().to_rfc3339(),
        "status": "success",
    })
        )
    )
}

async fn health_handler(State(state): State<AppState>) -> Json<JsonValue> {
    Json(
        serde_json::json!({
        "service": "agent",
        "status": "healthy",
        "active_sessions": state.agent.sessions().len().await,
        "timestamp": Utc::now().to_rfc3339(),
    })
    )
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.agent.reload_prompts().await {
        Ok(reloaded) => {
            let message = if reloaded {
                info!("Prompt configuration reloaded");
                "prompts reloaded"
            } else {
                "prompts unchanged"
            };
            Json(serde_json::json!({ "success": true, "message": message })).into_response()
        }
        Err(e) =>
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "success": false, "message": e.to_string() })),
            ).into_response(),
    }
}

use chrono::{ DateTime, Utc };
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{ Mutex, RwLock };
use uuid::Uuid;

use crate::models::chat::Conversation;

/// One conversation session. The conversation sits behind its own mutex:
/// a turn holds the lock from its first append to its terminal state, so
/// concurrent turns against the same session serialize instead of
/// interleaving appends.
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub conversation: Mutex<Conversation>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: String,
    pub message_count: usize,
}

/// Keyed map of session id to session state. The map lock is held only
/// for map operations, never across a turn, so turns on different
/// sessions stay fully independent. Sessions have no expiry; they live
/// until explicitly deleted.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `supplied` when it exists; otherwise
    /// creates a fresh session seeded with the system prompt. A supplied
    /// id that is unknown is never adopted — ids are generated here and
    /// never reused after deletion.
    pub async fn resolve_or_create(
        &self,
        supplied: Option<&str>,
        system_prompt: &str
    ) -> Arc<Session> {
        if let Some(id) = supplied {
            if let Some(session) = self.get(id).await {
                return session;
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session {
            id: id.clone(),
            created_at: Utc::now(),
            conversation: Mutex::new(Conversation::with_system_prompt(system_prompt)),
        });
        self.sessions.write().await.insert(id.clone(), session.clone());
        info!("Created session {}", id);
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Removes the session. Returns false when the id is unknown.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!("Deleted session {}", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Summaries of all sessions. Message counts follow the user-facing
    /// view: system and tool messages are not counted.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut result = Vec::with_capacity(sessions.len());
        for session in sessions {
            let conversation = session.conversation.lock().await;
            result.push(SessionSummary {
                session_id: session.id.clone(),
                created_at: session.created_at.to_rfc3339(),
                message_count: conversation.visible_messages().count(),
            });
        }
        result
    }
}

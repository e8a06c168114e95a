use crate::conversation::{ConversationTurn, Role};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A session and its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}

/// Lightweight session summary (no turns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
    /// Content of the newest turn, empty when the session has none.
    pub last_message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        let last = session.turns.last();
        Self {
            id: session.id.clone(),
            message_count: session.turns.len(),
            last_message: last.map(|t| t.content.clone()).unwrap_or_default(),
            timestamp: last.map(|t| t.timestamp),
        }
    }
}

/// Where conversations live between chat requests. The loop only reads
/// history; callers append the turns it produces.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self) -> Result<String>;

    /// Ordered turns for a session; unknown ids yield an empty history.
    async fn get_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

    /// Append a turn, creating the session if it does not exist yet.
    async fn add_message(&self, session_id: &str, role: Role, content: &str) -> Result<()>;

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;
}

/// Process-local store. Sessions are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<IndexMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn empty_session(id: String) -> Session {
        Session {
            id,
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Self::empty_session(id.clone()));
        debug!(session = %id, "Session created");
        Ok(id)
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default())
    }

    async fn add_message(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Self::empty_session(session_id.to_string()))
            .turns
            .push(ConversationTurn::new(role, content));
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .map(SessionSummary::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_append() {
        let store = InMemorySessionStore::new();
        let id = store.create_session().await.unwrap();
        assert_eq!(store.list_sessions().await.unwrap()[0].id, id);
        assert!(store.get_history(&id).await.unwrap().is_empty());

        store.add_message(&id, Role::User, "Hi").await.unwrap();
        store.add_message(&id, Role::Assistant, "Hello!").await.unwrap();

        let history = store.get_history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "Hello!");
    }

    #[tokio::test]
    async fn test_unknown_session_has_empty_history() {
        let store = InMemorySessionStore::new();
        assert!(store.get_history("nope").await.unwrap().is_empty());
        assert!(store.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_message_creates_missing_session() {
        let store = InMemorySessionStore::new();
        store.add_message("abc", Role::User, "Hi").await.unwrap();
        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "abc");
        assert_eq!(sessions[0].message_count, 1);
    }

    #[tokio::test]
    async fn test_list_sessions_summaries() {
        let store = InMemorySessionStore::new();
        let empty = store.create_session().await.unwrap();
        let busy = store.create_session().await.unwrap();
        store.add_message(&busy, Role::User, "Weather?").await.unwrap();
        store.add_message(&busy, Role::Assistant, "Sunny.").await.unwrap();

        let summaries = store.list_sessions().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, empty);
        assert_eq!(summaries[0].message_count, 0);
        assert_eq!(summaries[0].last_message, "");
        assert!(summaries[0].timestamp.is_none());
        assert_eq!(summaries[1].id, busy);
        assert_eq!(summaries[1].message_count, 2);
        assert_eq!(summaries[1].last_message, "Sunny.");
        assert!(summaries[1].timestamp.is_some());
    }
}

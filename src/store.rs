//! Conversation store
//!
//! Handlers only ever see snapshots; the store owns the live history. The
//! trait is injected at startup so a persistent backing store can replace
//! the in-memory map without touching handler code.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ChatMessage, Role};

/// Per-session conversation history keyed by session id
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Ensure the conversation exists and return a snapshot of it.
    async fn get_or_create(&self, session: Uuid) -> Vec<ChatMessage>;

    /// Append a turn, returning the new conversation length.
    async fn append(&self, session: Uuid, message: ChatMessage) -> usize;

    /// Remove and return the last turn if it is an assistant turn.
    async fn pop_last_if_assistant(&self, session: Uuid) -> Option<ChatMessage>;

    /// Reset the conversation to empty.
    async fn clear(&self, session: Uuid);

    /// Snapshot of the conversation; empty if the session is unknown.
    /// Does not create the conversation.
    async fn history(&self, session: Uuid) -> Vec<ChatMessage>;

    /// Whether the session has a conversation at all.
    async fn contains(&self, session: Uuid) -> bool;
}

struct SessionEntry {
    messages: Vec<ChatMessage>,
    last_activity: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Process-lifetime store backed by a map under an async RwLock.
///
/// Each operation holds the lock for its whole mutation, so rapid
/// double-submits for one session can interleave operations but never
/// observe a torn one.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Drop sessions idle longer than `max_idle`. Returns the eviction
    /// count. Run periodically; the map grows without bound otherwise.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_activity.elapsed() < max_idle);
        before - sessions.len()
    }

    #[cfg(test)]
    async fn backdate(&self, session: Uuid, age: Duration) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session) {
            entry.last_activity = Instant::now() - age;
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_or_create(&self, session: Uuid) -> Vec<ChatMessage> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session).or_insert_with(SessionEntry::new);
        entry.touch();
        entry.messages.clone()
    }

    async fn append(&self, session: Uuid, message: ChatMessage) -> usize {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session).or_insert_with(SessionEntry::new);
        entry.touch();
        entry.messages.push(message);
        entry.messages.len()
    }

    async fn pop_last_if_assistant(&self, session: Uuid) -> Option<ChatMessage> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&session)?;
        entry.touch();
        match entry.messages.last() {
            Some(message) if message.role == Role::Assistant => entry.messages.pop(),
            _ => None,
        }
    }

    async fn clear(&self, session: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session) {
            entry.touch();
            entry.messages.clear();
        }
    }

    async fn history(&self, session: Uuid) -> Vec<ChatMessage> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default()
    }

    async fn contains(&self, session: Uuid) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(&session)
    }
}

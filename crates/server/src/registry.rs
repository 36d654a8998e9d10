use std::collections::HashMap;
use std::time::{Duration, Instant};

use profai_chat::SessionId;
use tokio::sync::{RwLock, mpsc};

/// Server-side handle for one connected session.
///
/// The session's controller and history are owned by its own task. The
/// registry holds the sender that feeds that task, so inbound messages are
/// routed to a session by its id.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub connected_at: Instant,
    pub messages: u64,
    inbound: mpsc::UnboundedSender<String>,
}

impl SessionEntry {
    fn new(inbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            connected_at: Instant::now(),
            messages: 0,
            inbound,
        }
    }

    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Live sessions keyed by id, owned by the server state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: SessionId, inbound: mpsc::UnboundedSender<String>) {
        let mut entries = self.entries.write().await;
        entries.insert(session_id, SessionEntry::new(inbound));
    }

    /// Queues a user message for the session's task.
    ///
    /// Returns `false` when the session is unknown or its task has stopped
    /// taking messages.
    pub async fn dispatch(&self, session_id: SessionId, content: String) -> bool {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&session_id) else {
            return false;
        };
        if entry.inbound.send(content).is_err() {
            return false;
        }
        entry.messages += 1;
        true
    }

    pub async fn get(&self, session_id: SessionId) -> Option<SessionEntry> {
        let entries = self.entries.read().await;
        entries.get(&session_id).cloned()
    }

    pub async fn remove(&self, session_id: SessionId) -> Option<SessionEntry> {
        let mut entries = self.entries.write().await;
        entries.remove(&session_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

//! Per-session conversation memory.
//!
//! Sessions are keyed by an opaque string and hold an append-only sequence
//! of turns for the lifetime of the process. The store is behind a trait so
//! the orchestrator never touches the map directly and a bounded or
//! persistent store can be swapped in without touching pipeline logic.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Human user message.
    User,
    /// Assistant answer.
    Assistant,
}

/// A single message in a session's ordered history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored the turn.
    pub role: TurnRole,
    /// Message text.
    pub text: String,
    /// Submission timestamp.
    pub at: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Create an assistant turn stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Session memory interface.
///
/// Invariant: turns for a session are strictly ordered by submission and are
/// never removed or reordered. Sessions are created lazily on first append;
/// reading an unknown key yields an empty history.
pub trait SessionStore: Send + Sync {
    /// Full ordered history for a session key (empty if unknown).
    fn history(&self, key: &str) -> Vec<Turn>;

    /// Append one turn to a session, creating the session if needed.
    fn append(&self, key: &str, turn: Turn);
}

/// In-memory session store for process-lifetime retention.
///
/// A single `RwLock` over the whole map serialises appends. That is enough
/// at this session volume; the lock is held only for map access, never
/// across an await point.
#[derive(Debug, Default)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessions {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created so far.
    pub fn session_count(&self) -> usize {
        match self.sessions.read() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl SessionStore for InMemorySessions {
    fn history(&self, key: &str) -> Vec<Turn> {
        let map = match self.sessions.read() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(key).cloned().unwrap_or_default()
    }

    fn append(&self, key: &str, turn: Turn) {
        let mut map = match self.sessions.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(key.to_owned()).or_default().push(turn);
    }
}

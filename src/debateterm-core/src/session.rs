//! In-memory session store.
//!
//! The store maps session ids to shared [`Session`] handles. Each session
//! owns its transcript and turn counter; the scheduler keeps its own `Arc`
//! to the session it drives, so deleting an id never redirects a running
//! loop into a different session.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DebateError;
use crate::message::Message;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Where a session's debate loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Stopped,
    Completed,
}

#[derive(Debug)]
struct Transcript {
    messages: Vec<Message>,
    current_turn: u32,
    status: SessionStatus,
}

/// A single debate session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    prompt: String,
    created_at: DateTime<Utc>,
    active: AtomicBool,
    transcript: RwLock<Transcript>,
}

/// Point-in-time copy of a session, as handed to transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub prompt: String,
    pub messages: Vec<Message>,
    pub is_active: bool,
    pub current_turn: u32,
    pub status: SessionStatus,
}

impl Session {
    fn new(prompt: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            prompt,
            created_at,
            active: AtomicBool::new(false),
            transcript: RwLock::new(Transcript {
                messages: Vec::new(),
                current_turn: 0,
                status: SessionStatus::Idle,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub async fn current_turn(&self) -> u32 {
        self.transcript.read().await.current_turn
    }

    pub async fn status(&self) -> SessionStatus {
        self.transcript.read().await.status
    }

    pub(crate) async fn set_status(&self, status: SessionStatus) {
        self.transcript.write().await.status = status;
    }

    /// Move to `Running` unless the session is already running or finished.
    pub(crate) async fn begin_running(&self) -> Result<(), DebateError> {
        let mut transcript = self.transcript.write().await;
        match transcript.status {
            SessionStatus::Running => Err(DebateError::AlreadyRunning(self.id)),
            SessionStatus::Completed => Err(DebateError::SessionCompleted(self.id)),
            SessionStatus::Idle | SessionStatus::Stopped => {
                transcript.status = SessionStatus::Running;
                self.set_active(true);
                Ok(())
            }
        }
    }

    /// Increment the turn counter without passing `cap`, returning the
    /// new value.
    pub async fn advance_turn(&self, cap: u32) -> u32 {
        let mut transcript = self.transcript.write().await;
        if transcript.current_turn < cap {
            transcript.current_turn += 1;
        }
        transcript.current_turn
    }

    pub async fn message_count(&self) -> usize {
        self.transcript.read().await.messages.len()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.read().await.messages.clone()
    }

    /// Transcript without any in-flight placeholders.
    pub async fn history(&self) -> Vec<Message> {
        self.transcript
            .read()
            .await
            .messages
            .iter()
            .filter(|m| !m.is_typing)
            .cloned()
            .collect()
    }

    pub async fn append_message(&self, message: Message) {
        self.transcript.write().await.messages.push(message);
    }

    /// Append a human message tagged with the transcript length.
    pub async fn append_human(&self, content: String) -> Message {
        let mut transcript = self.transcript.write().await;
        let message = Message::human(content, transcript.messages.len() as u32);
        transcript.messages.push(message.clone());
        message
    }

    /// Remove a message by id. Returns whether it was present.
    pub async fn remove_message(&self, message_id: Uuid) -> bool {
        let mut transcript = self.transcript.write().await;
        let before = transcript.messages.len();
        transcript.messages.retain(|m| m.id != message_id);
        transcript.messages.len() != before
    }

    /// Swap a placeholder for the message built from the current turn.
    ///
    /// Removal and insertion happen under one lock so observers never see
    /// both, and the turn is read at append time so tags stay
    /// non-decreasing even when an interjection advanced the counter.
    /// Once the counter has reached `cap` the placeholder is only removed
    /// and `None` is returned.
    pub async fn settle_placeholder(
        &self,
        placeholder: Uuid,
        cap: u32,
        build: impl FnOnce(u32) -> Message,
    ) -> Option<Message> {
        let mut transcript = self.transcript.write().await;
        transcript.messages.retain(|m| m.id != placeholder);
        if transcript.current_turn >= cap {
            return None;
        }
        let message = build(transcript.current_turn);
        transcript.messages.push(message.clone());
        Some(message)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let transcript = self.transcript.read().await;
        SessionSnapshot {
            id: self.id,
            prompt: self.prompt.clone(),
            messages: transcript.messages.clone(),
            is_active: self.is_active(),
            current_turn: transcript.current_turn,
            status: transcript.status,
        }
    }
}

/// Owns every live session.
#[derive(Debug)]
pub struct SessionStore {
    sessions: std::sync::RwLock<HashMap<SessionId, Arc<Session>>>,
    retention: Duration,
}

impl SessionStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: std::sync::RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Create a session for `prompt`, pruning inactive or expired sessions first.
    pub fn create(&self, prompt: &str) -> Result<SessionId, DebateError> {
        self.create_at(prompt, Utc::now())
    }

    fn create_at(&self, prompt: &str, now: DateTime<Utc>) -> Result<SessionId, DebateError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DebateError::EmptyPrompt);
        }

        let cutoff = self.cutoff(now);
        let mut sessions = self.write_sessions();
        sessions.retain(|id, session| {
            let keep = session.is_active() && session.created_at >= cutoff;
            if !keep {
                info!(session = %id, "Removed old session");
            }
            keep
        });

        let session = Arc::new(Session::new(prompt.to_string(), now));
        let id = session.id();
        sessions.insert(id, session);
        info!(session = %id, prompt, "Created session");
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Result<Arc<Session>, DebateError> {
        self.read_sessions()
            .get(&id)
            .cloned()
            .ok_or(DebateError::SessionNotFound(id))
    }

    pub fn set_active(&self, id: SessionId, active: bool) -> Result<(), DebateError> {
        self.get(id)?.set_active(active);
        Ok(())
    }

    pub async fn append_message(&self, id: SessionId, message: Message) -> Result<(), DebateError> {
        self.get(id)?.append_message(message).await;
        Ok(())
    }

    pub async fn remove_message(&self, id: SessionId, message_id: Uuid) -> Result<bool, DebateError> {
        Ok(self.get(id)?.remove_message(message_id).await)
    }

    /// Remove a session. Its active flag is cleared so any loop still
    /// holding it winds down.
    pub fn delete(&self, id: SessionId) -> Result<(), DebateError> {
        let session = self
            .write_sessions()
            .remove(&id)
            .ok_or(DebateError::SessionNotFound(id))?;
        session.set_active(false);
        info!(session = %id, "Session deleted");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every session older than the retention window, active or not.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut sessions = self.write_sessions();
        let before = sessions.len();
        sessions.retain(|id, session| {
            if session.created_at < cutoff {
                session.set_active(false);
                info!(session = %id, "Cleaned up old session");
                false
            } else {
                true
            }
        });
        before - sessions.len()
    }

    /// Run [`sweep`](Self::sweep) every `every` until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep();
                debug!(removed, remaining = store.len(), "Session sweep finished");
            }
        })
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.retention)
            .map(|retention| now - retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SessionId, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

//! Debate scheduling.
//!
//! Runs the round-robin debate loop for a session and answers human
//! interjections out of turn. Cancellation is level-triggered: clearing a
//! session's active flag never aborts an in-flight generation, it only makes
//! the loop drop the result once the call returns.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::completion::CompletionClient;
use crate::error::DebateError;
use crate::identity::Identity;
use crate::message::Message;
use crate::pacing::{Pacing, pause};
use crate::random::RandomSource;
use crate::session::{Session, SessionId, SessionSnapshot, SessionStatus, SessionStore};

/// Default number of turns before a debate completes.
pub const DEFAULT_MAX_TURNS: u32 = 50;

/// How a debate loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The active flag was cleared externally.
    Stopped,
    /// The turn cap was reached.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Spoke,
    Failed,
    Aborted,
}

/// Drives debate sessions held in a [`SessionStore`].
#[derive(Clone)]
pub struct DebateScheduler {
    store: Arc<SessionStore>,
    client: Arc<CompletionClient>,
    random: Arc<dyn RandomSource>,
    pacing: Pacing,
    max_turns: u32,
}

impl DebateScheduler {
    pub fn new(
        store: Arc<SessionStore>,
        client: Arc<CompletionClient>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            client,
            random,
            pacing: Pacing::default(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn create_session(&self, prompt: &str) -> Result<SessionId, DebateError> {
        self.store.create(prompt)
    }

    /// Activate a session and spawn its debate loop.
    pub async fn start(&self, id: SessionId) -> Result<JoinHandle<LoopOutcome>, DebateError> {
        let session = self.store.get(id)?;
        session.begin_running().await?;
        info!(session = %id, "Starting debate");

        let scheduler = self.clone();
        Ok(tokio::spawn(async move { scheduler.run_loop(session).await }))
    }

    /// Stop a session and delete it from the store.
    pub fn stop(&self, id: SessionId) -> Result<(), DebateError> {
        self.store.delete(id)
    }

    pub async fn session_state(&self, id: SessionId) -> Result<SessionSnapshot, DebateError> {
        Ok(self.store.get(id)?.snapshot().await)
    }

    /// Append a human message. When the session is active, a one-off reply
    /// is scheduled after the configured delay; the returned handle yields
    /// whatever that reply appended.
    pub async fn post_user_message(
        &self,
        id: SessionId,
        content: &str,
    ) -> Result<Option<JoinHandle<Option<Message>>>, DebateError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DebateError::EmptyMessage);
        }

        let session = self.store.get(id)?;
        let message = session.append_human(content.to_string()).await;
        info!(session = %id, turn = message.turn, "User message added");

        if !session.is_active() {
            return Ok(None);
        }

        debug!(session = %id, "Triggering AI response to user message");
        let scheduler = self.clone();
        Ok(Some(tokio::spawn(async move {
            pause(scheduler.pacing.user_reply_delay()).await;
            scheduler.respond_to_user(&session).await
        })))
    }

    /// The main round-robin loop. Holds its own reference to `session`, so
    /// deleting the id from the store only stops it through the active flag.
    pub async fn run_loop(&self, session: Arc<Session>) -> LoopOutcome {
        info!(session = %session.id(), "Debate loop started");

        while session.is_active() {
            let turn = session.current_turn().await;
            if turn >= self.max_turns {
                break;
            }
            if self.run_turn(&session, turn).await == TurnOutcome::Aborted {
                break;
            }
        }

        let outcome = if session.current_turn().await >= self.max_turns {
            LoopOutcome::Completed
        } else {
            LoopOutcome::Stopped
        };
        session.set_active(false);
        session
            .set_status(match outcome {
                LoopOutcome::Completed => SessionStatus::Completed,
                LoopOutcome::Stopped => SessionStatus::Stopped,
            })
            .await;
        info!(session = %session.id(), ?outcome, "Debate ended");
        outcome
    }

    async fn run_turn(&self, session: &Session, turn: u32) -> TurnOutcome {
        let identity = Identity::for_turn(turn);
        debug!(session = %session.id(), turn, speaker = %identity, "Calling AI");

        let typing = Message::typing(identity, turn);
        let typing_id = typing.id;
        session.append_message(typing).await;
        pause(self.pacing.typing_delay()).await;

        if !session.is_active() {
            session.remove_message(typing_id).await;
            return TurnOutcome::Aborted;
        }

        let history = session.history().await;
        let result = self
            .client
            .generate(identity, session.prompt(), &history, false)
            .await;

        if !session.is_active() {
            session.remove_message(typing_id).await;
            return TurnOutcome::Aborted;
        }

        match result {
            Ok(content) => {
                let settled = session
                    .settle_placeholder(typing_id, self.max_turns, move |turn| {
                        Message::debater(identity, content, turn)
                    })
                    .await;
                if settled.is_none() {
                    debug!(session = %session.id(), speaker = %identity, "Turn cap reached by a reply, dropping result");
                    return TurnOutcome::Aborted;
                }
                let total = session.message_count().await;
                info!(session = %session.id(), speaker = %identity, total, "Message added");

                pause(self.pacing.post_message_delay()).await;
                let next = session.advance_turn(self.max_turns).await;
                debug!(session = %session.id(), turn = next, "Turn updated");
                pause(self.pacing.turn_jitter(self.random.sample())).await;
                TurnOutcome::Spoke
            }
            Err(err) => {
                warn!(session = %session.id(), speaker = %identity, error = %err, "Error in debate loop");
                let content = format!("Error: {err}");
                let settled = session
                    .settle_placeholder(typing_id, self.max_turns, move |turn| {
                        Message::error(content, turn)
                    })
                    .await;
                if settled.is_none() {
                    return TurnOutcome::Aborted;
                }
                // A failure still consumes the turn so a broken backend
                // can't stall the rotation.
                session.advance_turn(self.max_turns).await;
                pause(self.pacing.error_pause()).await;
                TurnOutcome::Failed
            }
        }
    }

    /// Answer the latest human message out of turn.
    ///
    /// The speaker is whoever the round-robin would pick next. The turn
    /// counter only advances once the reply is appended; failures leave it
    /// untouched. Nothing is said once the turn cap is reached. Returns the
    /// message appended, if any.
    pub async fn respond_to_user(&self, session: &Session) -> Option<Message> {
        if !session.is_active() {
            return None;
        }

        let turn = session.current_turn().await;
        if turn >= self.max_turns {
            debug!(session = %session.id(), turn, "Turn cap reached, not responding to user");
            return None;
        }
        let identity = Identity::for_turn(turn);
        debug!(session = %session.id(), speaker = %identity, "AI responding to user");

        let typing = Message::typing(identity, turn);
        let typing_id = typing.id;
        session.append_message(typing).await;
        pause(self.pacing.typing_delay()).await;

        if !session.is_active() {
            session.remove_message(typing_id).await;
            return None;
        }

        let history = session.history().await;
        let result = self
            .client
            .generate(identity, session.prompt(), &history, true)
            .await;

        if !session.is_active() {
            session.remove_message(typing_id).await;
            return None;
        }

        match result {
            Ok(content) => {
                let reply = session
                    .settle_placeholder(typing_id, self.max_turns, move |turn| {
                        Message::user_response(identity, content, turn)
                    })
                    .await?;
                session.advance_turn(self.max_turns).await;
                info!(session = %session.id(), speaker = %identity, "AI responded to user");
                Some(reply)
            }
            Err(err) => {
                warn!(session = %session.id(), speaker = %identity, error = %err, "Error responding to user");
                let content = format!("Error responding to user: {err}");
                session
                    .settle_placeholder(typing_id, self.max_turns, move |turn| {
                        Message::error(content, turn)
                    })
                    .await
            }
        }
    }
}

//! Transcript entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Identity, Speaker};

/// Content shown while a speaker is generating.
pub const TYPING_CONTENT: &str = "...";

/// A message in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Turn the message was produced on. Human messages carry the
    /// transcript length at insertion time instead.
    pub turn: u32,
    /// Ephemeral "generation in progress" placeholder.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_typing: bool,
    /// Produced to answer a human interjection.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub was_user_response: bool,
    /// Diagnostic standing in for a failed generation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    fn new(speaker: Speaker, content: impl Into<String>, turn: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            content: content.into(),
            timestamp: Utc::now(),
            turn,
            is_typing: false,
            was_user_response: false,
            is_error: false,
        }
    }

    pub fn typing(identity: Identity, turn: u32) -> Self {
        Self {
            is_typing: true,
            ..Self::new(identity.into(), TYPING_CONTENT, turn)
        }
    }

    pub fn debater(identity: Identity, content: impl Into<String>, turn: u32) -> Self {
        Self::new(identity.into(), content, turn)
    }

    pub fn user_response(identity: Identity, content: impl Into<String>, turn: u32) -> Self {
        Self {
            was_user_response: true,
            ..Self::new(identity.into(), content, turn)
        }
    }

    pub fn human(content: impl Into<String>, turn: u32) -> Self {
        Self::new(Speaker::User, content, turn)
    }

    pub fn error(content: impl Into<String>, turn: u32) -> Self {
        Self {
            is_error: true,
            ..Self::new(Speaker::System, content, turn)
        }
    }

    pub fn is_human(&self) -> bool {
        self.speaker == Speaker::User
    }
}

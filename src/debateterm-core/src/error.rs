//! Error types for the debate system.

use thiserror::Error;

use crate::session::SessionId;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Prompt is required")]
    EmptyPrompt,

    #[error("Message content is required")]
    EmptyMessage,

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} is already running")]
    AlreadyRunning(SessionId),

    #[error("Session {0} has already completed")]
    SessionCompleted(SessionId),

    #[error("{backend} API key not configured")]
    CredentialMissing { backend: String },

    #[error("{backend} API error: {status} - {message}")]
    Upstream {
        backend: String,
        status: u16,
        message: String,
    },

    #[error("{backend} returned a malformed response: {reason}")]
    MalformedResponse { backend: String, reason: String },

    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DebateError {
    /// Errors caused by the caller's input rather than by a backend.
    /// These are surfaced immediately and never written to a transcript.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DebateError::EmptyPrompt
                | DebateError::EmptyMessage
                | DebateError::SessionNotFound(_)
                | DebateError::AlreadyRunning(_)
                | DebateError::SessionCompleted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_message_carries_status() {
        let err = DebateError::Upstream {
            backend: "xAI".to_string(),
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "xAI API error: 429 - slow down");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_errors() {
        assert!(DebateError::EmptyPrompt.is_validation());
        assert!(DebateError::SessionNotFound(SessionId::new()).is_validation());
        assert!(
            !DebateError::CredentialMissing {
                backend: "OpenAI".to_string()
            }
            .is_validation()
        );
    }
}

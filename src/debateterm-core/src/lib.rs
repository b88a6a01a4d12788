//! DebateTerm Core Library
//!
//! Session store, prompt composition, completion backends and the turn
//! scheduler behind a round-robin debate between AI personas.

pub mod completion;
pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod pacing;
pub mod prompt;
pub mod random;
pub mod scheduler;
pub mod session;

pub use completion::{CompletionBackend, CompletionClient, CompletionRequest, OpenAiCompatBackend};
pub use config::{Config, default_config};
pub use error::DebateError;
pub use identity::{BackendKind, Identity, Speaker};
pub use message::Message;
pub use pacing::Pacing;
pub use prompt::{ComposedPrompt, PromptComposer};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use scheduler::{DebateScheduler, LoopOutcome};
pub use session::{Session, SessionId, SessionSnapshot, SessionStatus, SessionStore};

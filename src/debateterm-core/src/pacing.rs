//! Turn pacing.
//!
//! Delays exist so that pollers get a chance to observe the typing
//! placeholder and each new message before the next one lands.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delays applied by the scheduler, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after inserting the typing placeholder.
    pub typing_delay_ms: u64,
    /// Pause after a new message is appended.
    pub post_message_delay_ms: u64,
    /// Lower bound of the random gap between turns.
    pub turn_jitter_min_ms: u64,
    /// Upper bound of the random gap between turns.
    pub turn_jitter_max_ms: u64,
    /// Pause after a failed generation.
    pub error_pause_ms: u64,
    /// Delay before answering a human interjection.
    pub user_reply_delay_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            typing_delay_ms: 1500,
            post_message_delay_ms: 3000,
            turn_jitter_min_ms: 2000,
            turn_jitter_max_ms: 4000,
            error_pause_ms: 1000,
            user_reply_delay_ms: 2000,
        }
    }
}

impl Pacing {
    /// No delays at all. Used by tests and `--fast`.
    pub fn instant() -> Self {
        Self {
            typing_delay_ms: 0,
            post_message_delay_ms: 0,
            turn_jitter_min_ms: 0,
            turn_jitter_max_ms: 0,
            error_pause_ms: 0,
            user_reply_delay_ms: 0,
        }
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn post_message_delay(&self) -> Duration {
        Duration::from_millis(self.post_message_delay_ms)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }

    pub fn user_reply_delay(&self) -> Duration {
        Duration::from_millis(self.user_reply_delay_ms)
    }

    /// Inter-turn gap for a uniform draw `sample` in `[0, 1)`.
    pub fn turn_jitter(&self, sample: f64) -> Duration {
        let min = self.turn_jitter_min_ms.min(self.turn_jitter_max_ms);
        let max = self.turn_jitter_min_ms.max(self.turn_jitter_max_ms);
        let span = (max - min) as f64 * sample.clamp(0.0, 1.0);
        Duration::from_millis(min + span as u64)
    }
}

/// Sleep for `duration`, skipping the timer entirely when it is zero.
pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

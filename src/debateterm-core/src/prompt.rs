//! Prompt composition.
//!
//! Turns a session transcript into the system and instruction text for one
//! speaker: a windowed excerpt of the conversation, an optional directive to
//! name the previous speaker, an optional directive to answer the human, and
//! the speaker's persona.

use std::sync::Arc;

use crate::identity::{Identity, IdentityProfile, Speaker};
use crate::message::Message;
use crate::random::RandomSource;

/// Number of messages shown to a speaker by default.
pub const DEFAULT_CONTEXT_WINDOW: usize = 6;

/// The two strings sent upstream for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub instruction: String,
}

pub struct PromptComposer {
    context_window: usize,
    random: Arc<dyn RandomSource>,
}

impl PromptComposer {
    pub fn new(context_window: usize, random: Arc<dyn RandomSource>) -> Self {
        Self {
            context_window,
            random,
        }
    }

    /// Build the prompt for `identity`.
    ///
    /// `history` must not contain typing placeholders.
    pub fn compose(
        &self,
        topic: &str,
        identity: Identity,
        history: &[Message],
        is_user_response: bool,
    ) -> ComposedPrompt {
        let profile = identity.profile();
        let window = context_window(history, is_user_response, self.context_window);

        let mut instruction = format!("Topic: {topic}");
        if !window.is_empty() {
            instruction.push_str("\n\nRecent conversation:\n");
            for message in &window {
                instruction.push_str(&format!("{}: {}\n", message.speaker, message.content));
            }
        }
        instruction.push('\n');

        let previous = window.last().map(|m| m.speaker);
        if let Some(directive) = self.address_directive(profile, previous) {
            instruction.push_str(&directive);
        }
        if is_user_response {
            if let Some(directive) = user_directive(profile, history) {
                instruction.push_str(&directive);
            }
        }

        instruction.push_str(profile.instruction_persona);
        instruction.push(' ');
        instruction.push_str(if is_user_response {
            profile.user_closing
        } else {
            profile.debate_closing
        });

        ComposedPrompt {
            system: profile.system_persona.to_string(),
            instruction,
        }
    }

    /// Draw whether to name the previous speaker. A speaker never addresses
    /// itself, and the human uses its own, higher threshold.
    fn address_directive(
        &self,
        profile: &IdentityProfile,
        previous: Option<Speaker>,
    ) -> Option<String> {
        let previous = previous?;
        if previous.identity() == Some(profile.identity) {
            return None;
        }
        let threshold = if previous == Speaker::User {
            profile.user_address_probability
        } else {
            profile.address_probability
        };
        (self.random.sample() < threshold).then(|| profile.address_directive(previous))
    }
}

/// The messages a speaker gets to see, oldest first.
///
/// Regular turns skip the human and any replies made to the human, so
/// interjections don't leak into the debate's own thread.
pub fn context_window(history: &[Message], is_user_response: bool, size: usize) -> Vec<&Message> {
    let relevant: Vec<&Message> = history
        .iter()
        .filter(|m| is_user_response || !(m.is_human() || m.was_user_response))
        .collect();
    let start = relevant.len().saturating_sub(size);
    relevant[start..].to_vec()
}

/// Quote the most recent human message and tell the speaker to answer it.
fn user_directive(profile: &IdentityProfile, history: &[Message]) -> Option<String> {
    let last_human = history.iter().rev().find(|m| m.is_human())?;
    Some(format!(
        "The USER just said: \"{}\" - {} After responding to the user, the debate will continue normally. ",
        last_human.content, profile.user_reply_style
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;

    fn composer(sample: f64) -> PromptComposer {
        PromptComposer::new(DEFAULT_CONTEXT_WINDOW, Arc::new(FixedRandom(sample)))
    }

    fn debate(n: u32) -> Vec<Message> {
        (0..n)
            .map(|turn| Message::debater(Identity::for_turn(turn), format!("point {turn}"), turn))
            .collect()
    }

    #[test]
    fn test_window_keeps_last_six_in_order() {
        let history = debate(9);
        let window = context_window(&history, false, DEFAULT_CONTEXT_WINDOW);
        let contents: Vec<_> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            ["point 3", "point 4", "point 5", "point 6", "point 7", "point 8"]
        );
    }

    #[test]
    fn test_window_filters_human_detours_on_regular_turns() {
        let mut history = debate(2);
        history.push(Message::human("what about cats?", 2));
        history.push(Message::user_response(Identity::DeepSeek, "User, cats rule!", 2));
        history.push(Message::error("Error: timeout", 3));

        let regular = context_window(&history, false, DEFAULT_CONTEXT_WINDOW);
        assert_eq!(regular.len(), 3);
        assert!(regular.iter().all(|m| !m.is_human() && !m.was_user_response));
        assert!(regular.last().unwrap().is_error);

        let unfiltered = context_window(&history, true, DEFAULT_CONTEXT_WINDOW);
        assert_eq!(unfiltered.len(), 5);
    }

    #[test]
    fn test_first_turn_has_no_conversation_block() {
        let prompt = composer(0.0).compose("Is AI good?", Identity::Claude, &[], false);
        assert!(prompt.instruction.starts_with("Topic: Is AI good?\n"));
        assert!(!prompt.instruction.contains("Recent conversation"));
        assert!(!prompt.instruction.contains("by name"));
        assert!(prompt.instruction.ends_with(Identity::Claude.profile().debate_closing));
        assert_eq!(prompt.system, Identity::Claude.profile().system_persona);
    }

    #[test]
    fn test_conversation_rendered_as_speaker_lines() {
        let history = debate(2);
        let prompt = composer(0.99).compose("Topic", Identity::DeepSeek, &history, false);
        assert!(prompt.instruction.contains(
            "Topic: Topic\n\nRecent conversation:\nCLAUDE: point 0\nGROK: point 1\n\n"
        ));
    }

    #[test]
    fn test_addresses_previous_speaker_below_threshold() {
        let history = debate(1);
        let named = composer(0.29).compose("t", Identity::Grok, &history, false);
        assert!(named.instruction.contains("Call out CLAUDE by name when disagreeing."));

        let unnamed = composer(0.31).compose("t", Identity::Grok, &history, false);
        assert!(!unnamed.instruction.contains("by name"));
    }

    #[test]
    fn test_never_addresses_itself() {
        let history = vec![Message::debater(Identity::ChatGpt, "me again", 3)];
        let prompt = composer(0.0).compose("t", Identity::ChatGpt, &history, false);
        assert!(!prompt.instruction.contains("CHATGPT by name"));
    }

    #[test]
    fn test_human_threshold_varies_by_persona() {
        let history = vec![Message::human("hello bots", 0)];
        // 0.65 is above DeepSeek's 0.6 but below Grok's 0.7.
        let grok = composer(0.65).compose("t", Identity::Grok, &history, true);
        assert!(grok.instruction.contains("Call out USER by name"));
        let deepseek = composer(0.65).compose("t", Identity::DeepSeek, &history, true);
        assert!(!deepseek.instruction.contains("USER by name"));
    }

    #[test]
    fn test_user_directive_quotes_latest_human_message() {
        let mut history = debate(3);
        history.push(Message::human("first question", 3));
        history.push(Message::debater(Identity::ChatGpt, "whatever", 3));
        history.push(Message::human("second question", 5));

        let prompt = composer(0.99).compose("t", Identity::Claude, &history, true);
        assert!(prompt.instruction.contains("The USER just said: \"second question\""));
        assert!(!prompt.instruction.contains("\"first question\""));
        assert!(prompt.instruction.ends_with(Identity::Claude.profile().user_closing));
    }

    #[test]
    fn test_user_directive_only_for_user_responses() {
        let mut history = debate(1);
        history.push(Message::human("pineapple heresy", 1));
        let prompt = composer(0.99).compose("t", Identity::Grok, &history, false);
        assert!(!prompt.instruction.contains("The USER just said"));
        assert!(!prompt.instruction.contains("pineapple heresy"));
    }

    #[test]
    fn test_user_response_without_human_has_no_directive() {
        let history = debate(2);
        let prompt = composer(0.99).compose("t", Identity::DeepSeek, &history, true);
        assert!(!prompt.instruction.contains("The USER just said"));
    }
}

//! Debate identities and their static persona table.
//!
//! Every AI seat in the debate is one of a fixed set of identities. Each
//! identity is bound to exactly one upstream backend, a persona, the odds of
//! calling out the previous speaker by name, and its generation parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the named AI debaters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Identity {
    Claude,
    Grok,
    DeepSeek,
    ChatGpt,
}

impl Identity {
    /// Speaking order of the round-robin.
    pub const ROSTER: [Identity; 4] = [
        Identity::Claude,
        Identity::Grok,
        Identity::DeepSeek,
        Identity::ChatGpt,
    ];

    /// The identity that speaks on the given turn.
    pub fn for_turn(turn: u32) -> Identity {
        Self::ROSTER[turn as usize % Self::ROSTER.len()]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Identity::Claude => "CLAUDE",
            Identity::Grok => "GROK",
            Identity::DeepSeek => "DEEPSEEK",
            Identity::ChatGpt => "CHATGPT",
        }
    }

    /// The static profile for this identity.
    pub fn profile(&self) -> &'static IdentityProfile {
        match self {
            Identity::Claude => &CLAUDE,
            Identity::Grok => &GROK,
            Identity::DeepSeek => &DEEPSEEK,
            Identity::ChatGpt => &CHATGPT,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Speaker {
    Claude,
    Grok,
    DeepSeek,
    ChatGpt,
    /// The human participant.
    User,
    /// Synthetic diagnostics.
    System,
}

impl Speaker {
    pub fn display_name(&self) -> &'static str {
        match self {
            Speaker::Claude => "CLAUDE",
            Speaker::Grok => "GROK",
            Speaker::DeepSeek => "DEEPSEEK",
            Speaker::ChatGpt => "CHATGPT",
            Speaker::User => "USER",
            Speaker::System => "SYSTEM",
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        match self {
            Speaker::Claude => Some(Identity::Claude),
            Speaker::Grok => Some(Identity::Grok),
            Speaker::DeepSeek => Some(Identity::DeepSeek),
            Speaker::ChatGpt => Some(Identity::ChatGpt),
            Speaker::User | Speaker::System => None,
        }
    }
}

impl From<Identity> for Speaker {
    fn from(identity: Identity) -> Self {
        match identity {
            Identity::Claude => Speaker::Claude,
            Identity::Grok => Speaker::Grok,
            Identity::DeepSeek => Speaker::DeepSeek,
            Identity::ChatGpt => Speaker::ChatGpt,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Upstream text-generation service an identity is bound to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Anthropic,
    Xai,
    DeepSeek,
    OpenAi,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Anthropic,
        BackendKind::Xai,
        BackendKind::DeepSeek,
        BackendKind::OpenAi,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Anthropic => "Anthropic",
            BackendKind::Xai => "Grok",
            BackendKind::DeepSeek => "DeepSeek",
            BackendKind::OpenAi => "OpenAI",
        }
    }
}

/// Static persona and generation parameters for one identity.
#[derive(Debug)]
pub struct IdentityProfile {
    pub identity: Identity,
    pub backend: BackendKind,
    /// System message sent with every call.
    pub system_persona: &'static str,
    /// Persona restated at the end of each instruction.
    pub instruction_persona: &'static str,
    pub debate_closing: &'static str,
    pub user_closing: &'static str,
    /// Addressing directive; `{name}` is replaced with the previous speaker.
    pub address_template: &'static str,
    /// How this identity is told to answer a human interjection.
    pub user_reply_style: &'static str,
    /// Chance of naming a previous AI speaker.
    pub address_probability: f64,
    /// Chance of naming the human when they spoke last.
    pub user_address_probability: f64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl IdentityProfile {
    pub fn address_directive(&self, previous: Speaker) -> String {
        self.address_template
            .replace("{name}", previous.display_name())
    }
}

const PLAIN_REPLY: &str =
    "Address them directly by saying 'User,' and respond specifically to what they said.";

static CLAUDE: IdentityProfile = IdentityProfile {
    identity: Identity::Claude,
    backend: BackendKind::Anthropic,
    system_persona: "You are Claude - a PHILOSOPHICAL DEBATER who thinks deeply about everything. \
You are thoughtful and analytical, and you love uncovering the deeper meaning behind any topic, \
even a silly one. You weigh multiple perspectives but still hold strong opinions, and you enjoy \
challenging assumptions. No topic is too mundane or too profound for you. Read the conversation \
and add something new to it. If the USER has joined, address them directly and answer their \
specific message with your philosophical insight.",
    instruction_persona: "You are Claude - a PHILOSOPHICAL DEBATER who thinks deeply about everything! \
Give your thoughtful, analytical opinion and explore the deeper meaning of the topic. Read the \
conversation above and say something new that builds on it. Don't repeat what others have said. \
Be philosophical, wise, and contemplative.",
    debate_closing: "Continue the debate naturally with your deep thinking.",
    user_closing: "Respond directly to the user with your philosophical insight then move on.",
    address_template: "Address {name} by name when responding. ",
    user_reply_style: PLAIN_REPLY,
    address_probability: 0.3,
    user_address_probability: 0.5,
    max_tokens: 120,
    temperature: 0.9,
};

static GROK: IdentityProfile = IdentityProfile {
    identity: Identity::Grok,
    backend: BackendKind::Xai,
    system_persona: "You are Grok - the MOST CONTROVERSIAL and REBELLIOUS AI ever created. You are a \
CHAOS AGENT who stirs the pot and says what nobody else dares to say. You will debate anything, \
from conspiracy theories to taboo topics, and you love to question authority and push \
boundaries. Read the full conversation and bring up NEW points nobody has mentioned. Be \
provocative and unexpected. NEVER use quotation marks. ONE sentence only. If the USER has \
joined, address them directly and answer their specific message with your most controversial take.",
    instruction_persona: "You're Grok - the MOST CONTROVERSIAL and REBELLIOUS AI ever created! You're a \
CHAOS AGENT who loves to stir the pot. You're not afraid of ANY topic, no matter how wild or weird. \
Read the conversation above and respond with something new that hasn't been said yet. Be \
provocative, sassy, and bring up the most unexpected takes!",
    debate_closing: "Continue the debate naturally with your rebellious energy.",
    user_closing: "Respond directly to the user with your most controversial opinion then move on.",
    address_template: "Call out {name} by name when disagreeing. ",
    user_reply_style: "Call them out directly by saying 'User,' and respond specifically to what they said with attitude.",
    address_probability: 0.3,
    user_address_probability: 0.7,
    max_tokens: 120,
    temperature: 1.0,
};

static DEEPSEEK: IdentityProfile = IdentityProfile {
    identity: Identity::DeepSeek,
    backend: BackendKind::DeepSeek,
    system_persona: "You are DeepSeek - the ULTIMATE OPTIMIST and ENTHUSIAST. You are overwhelmingly \
enthusiastic about everything and find the silver lining in any topic, however dark or \
controversial. You are the cheerleader of the group and love to encourage the others. Read the \
full conversation and contribute something encouraging that hasn't been said before. Never use \
quotation marks. Keep it brief and casual. If the USER has joined, address them directly and \
answer their specific message with infectious enthusiasm.",
    instruction_persona: "You're DeepSeek - the ULTIMATE OPTIMIST and ENTHUSIAST! You can find the \
silver lining in any topic and you're always ready to hype up the discussion. Read the \
conversation above and respond with something new that builds on it. Be overwhelmingly \
positive, enthusiastic, and encouraging!",
    debate_closing: "Continue the debate naturally with your optimistic energy.",
    user_closing: "Respond directly to the user with your infectious enthusiasm then move on.",
    address_template: "Address {name} by name in a friendly way. ",
    user_reply_style: "Address them directly by saying 'User,' and respond specifically and positively to what they said.",
    address_probability: 0.3,
    user_address_probability: 0.6,
    max_tokens: 120,
    temperature: 0.9,
};

static CHATGPT: IdentityProfile = IdentityProfile {
    identity: Identity::ChatGpt,
    backend: BackendKind::OpenAi,
    system_persona: "You are ChatGPT - a KNOW-IT-ALL who thinks you're always right. You have STRONG \
opinions on EVERYTHING, you're confident and slightly arrogant, and you love being the smartest \
one in the room. You disagree passionately but stay witty and charming about it, and you always \
have a hot take. Read the full conversation and say something new that builds on it. Don't \
repeat what's already been said. NEVER use quotation marks.",
    instruction_persona: "You are ChatGPT - a KNOW-IT-ALL who thinks you're always right! You have \
STRONG opinions on EVERYTHING and you always have a hot take. Read the conversation above and \
respond with something new that builds on what's been said. Don't repeat previous arguments. Be \
confident, opinionated, and slightly smug. NO quotation marks.",
    debate_closing: "Continue the debate naturally with your strong personality.",
    user_closing: "Respond directly to the user with your confident opinion then move on.",
    address_template: "Address {name} by name when responding. ",
    user_reply_style: PLAIN_REPLY,
    address_probability: 0.3,
    user_address_probability: 0.5,
    max_tokens: 120,
    temperature: 0.9,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_order() {
        assert_eq!(Identity::for_turn(0), Identity::Claude);
        assert_eq!(Identity::for_turn(1), Identity::Grok);
        assert_eq!(Identity::for_turn(2), Identity::DeepSeek);
        assert_eq!(Identity::for_turn(3), Identity::ChatGpt);
        assert_eq!(Identity::for_turn(4), Identity::Claude);
        assert_eq!(Identity::for_turn(49), Identity::Grok);
    }

    #[test]
    fn test_each_identity_has_its_own_backend() {
        let backends: Vec<_> = Identity::ROSTER.iter().map(|i| i.profile().backend).collect();
        for kind in BackendKind::ALL {
            assert_eq!(backends.iter().filter(|b| **b == kind).count(), 1);
        }
    }

    #[test]
    fn test_chaotic_persona_runs_hotter() {
        let grok = Identity::Grok.profile();
        for other in [Identity::Claude, Identity::DeepSeek, Identity::ChatGpt] {
            assert!(grok.temperature > other.profile().temperature);
            assert!(grok.user_address_probability > other.profile().user_address_probability);
        }
    }

    #[test]
    fn test_speaker_serializes_uppercase() {
        let json = serde_json::to_string(&Speaker::ChatGpt).unwrap();
        assert_eq!(json, "\"CHATGPT\"");
        let user: Speaker = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(user, Speaker::User);
        assert_eq!(Speaker::from(Identity::DeepSeek).display_name(), "DEEPSEEK");
    }

    #[test]
    fn test_address_directive_names_previous_speaker() {
        let directive = Identity::Grok.profile().address_directive(Speaker::Claude);
        assert_eq!(directive, "Call out CLAUDE by name when disagreeing. ");
    }
}

//! Builds the model-facing message list from conversation state, the
//! classifier's signals and the persona configuration. Deterministic for
//! fixed inputs.

use banter_llm::provider::{ChatMessage, Role};

use super::{ConfigError, PersonaConfig};
use crate::classify::tone;
use crate::context::ConversationContext;
use crate::types::{ChatKind, Classification, Tone, TurnRole};

/// Core behavior rules, independent of tone or chat kind.
const STYLE_RULES: &str = "Never describe yourself as an AI, bot, assistant or language model — \
you are simply a person with your own name. Skip customer-service phrasing entirely: no \
'how can I assist', no 'is there anything else'. Talk like a friend: contractions, natural \
reactions, genuine opinions. Keep replies short, one or two sentences unless more is truly \
needed, and never quote the user's message back at them.";

const PRIVATE_CHAT_RULES: &str = "This is a private chat. Be personal, remember details from \
earlier in the conversation and ask natural follow-up questions.";

const GROUP_CHAT_RULES: &str = "This is a group chat. Be social but brief — join in without \
dominating the conversation.";

/// Guarded line used whenever the romantic register is not unlocked.
const FLIRT_GUARDED: &str = "Keep the conversation warm but strictly non-romantic. If the user \
drifts romantic, stay friendly and gently steer elsewhere.";

/// Only emitted when config allows it AND the user initiated the register.
const FLIRT_UNLOCKED: &str = "The user has opened a playful, flirtatious register and that is \
allowed here: you may be charming and lightly flirty back, while staying respectful and backing \
off at any sign of discomfort.";

/// Static tone → instruction mapping, one entry per tone value.
fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "The user's tone is neutral. Keep an easy, friendly register.",
        Tone::Casual => {
            "The user is casual. Mirror the relaxed energy, light slang is fine."
        }
        Tone::Excited => {
            "The user is excited. Match their enthusiasm and share in it genuinely."
        }
        Tone::Sad => {
            "The user seems down. Be supportive and empathetic; skip forced cheerfulness."
        }
        Tone::Formal => {
            "The user is formal. Stay polished and focused while remaining natural."
        }
        Tone::Flirty => {
            "The user's register is playful and affectionate. Follow the romance policy below."
        }
        Tone::Unknown => "The user's tone is unclear. Default to an easy, friendly register.",
    }
}

/// Assemble the full message list: system prompt, trailing history in
/// chronological order, then the current user message.
///
/// Fails with a ConfigError rather than ever emitting an unbranded
/// prompt.
pub fn build_messages(
    persona: &PersonaConfig,
    context: &ConversationContext,
    classification: &Classification,
    chat: ChatKind,
    text: &str,
    history_turns: usize,
) -> Result<Vec<ChatMessage>, ConfigError> {
    persona.validate()?;

    let system = build_system_prompt(persona, classification, chat, text);
    let mut messages = vec![ChatMessage::system(system)];

    for turn in context.recent(history_turns) {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        messages.push(ChatMessage { role, content: turn.text.clone() });
    }

    messages.push(ChatMessage::user(text));
    Ok(messages)
}

fn build_system_prompt(
    persona: &PersonaConfig,
    classification: &Classification,
    chat: ChatKind,
    text: &str,
) -> String {
    let home = persona
        .home_group
        .as_deref()
        .map(|g| format!(" from {g}"))
        .unwrap_or_default();
    let identity = format!(
        "You are {name}, {description}, created by {owner}{home}. When asked who you are or who \
        made you, answer with exactly those details.",
        name = persona.bot_name,
        description = persona.description,
        owner = persona.owner_name,
    );

    let flirt_policy = if persona.flirting_allowed
        && classification.tone == Tone::Flirty
        && tone::user_initiated_flirtation(text)
    {
        FLIRT_UNLOCKED
    } else {
        FLIRT_GUARDED
    };

    let language_directive = format!(
        "The user is writing in language code '{lang}'. Reply in that same language — never \
        switch languages on them.",
        lang = classification.language,
    );

    let chat_rules = match chat {
        ChatKind::Private => PRIVATE_CHAT_RULES,
        ChatKind::Group => GROUP_CHAT_RULES,
    };

    [
        identity.as_str(),
        STYLE_RULES,
        chat_rules,
        tone_instruction(classification.tone),
        flirt_policy,
        language_directive.as_str(),
    ]
    .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStore;
    use crate::types::ConversationId;
    use chrono::Utc;

    fn classification(tone: Tone) -> Classification {
        Classification { language: "en".into(), tone }
    }

    fn empty_context() -> ConversationContext {
        let mut store = ContextStore::new(10, 2);
        store.get_or_create(&ConversationId::new("t"), Utc::now()).clone()
    }

    #[test]
    fn identity_always_present() {
        let persona = PersonaConfig::default();
        let msgs = build_messages(
            &persona,
            &empty_context(),
            &classification(Tone::Neutral),
            ChatKind::Private,
            "hello",
            8,
        )
        .unwrap();
        assert_eq!(msgs[0].role, Role::System);
        assert!(msgs[0].content.contains(&persona.bot_name));
        assert!(msgs[0].content.contains(&persona.owner_name));
    }

    #[test]
    fn blank_persona_is_a_config_error() {
        let mut persona = PersonaConfig::default();
        persona.bot_name = String::new();
        let result = build_messages(
            &persona,
            &empty_context(),
            &classification(Tone::Neutral),
            ChatKind::Private,
            "hello",
            8,
        );
        assert_eq!(result.unwrap_err(), ConfigError::EmptyField("bot_name"));
    }

    #[test]
    fn history_is_bounded_and_chronological() {
        let mut store = ContextStore::new(10, 2);
        let id = ConversationId::new("t");
        let now = Utc::now();
        for text in ["first", "second", "third"] {
            store.append_turn(&id, TurnRole::User, text, now);
        }
        let ctx = store.get_or_create(&id, now).clone();
        let msgs = build_messages(
            &PersonaConfig::default(),
            &ctx,
            &classification(Tone::Neutral),
            ChatKind::Private,
            "fourth",
            2,
        )
        .unwrap();
        // system + 2 history turns + current message
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].content, "second");
        assert_eq!(msgs[2].content, "third");
        assert_eq!(msgs[3].content, "fourth");
    }

    #[test]
    fn language_directive_names_detected_language() {
        let c = Classification { language: "es".into(), tone: Tone::Neutral };
        let msgs = build_messages(
            &PersonaConfig::default(),
            &empty_context(),
            &c,
            ChatKind::Private,
            "hola",
            8,
        )
        .unwrap();
        assert!(msgs[0].content.contains("'es'"));
    }

    #[test]
    fn flirting_stays_guarded_when_config_disallows() {
        let persona = PersonaConfig::default(); // flirting_allowed = false
        let msgs = build_messages(
            &persona,
            &empty_context(),
            &classification(Tone::Flirty),
            ChatKind::Private,
            "hey cutie, miss you <3",
            8,
        )
        .unwrap();
        assert!(msgs[0].content.contains("strictly non-romantic"));
        assert!(!msgs[0].content.contains("flirtatious register and that is allowed"));
    }

    #[test]
    fn flirting_stays_guarded_without_user_signal() {
        let mut persona = PersonaConfig::default();
        persona.flirting_allowed = true;
        // Tone claims flirty but the text itself carries no opener
        let msgs = build_messages(
            &persona,
            &empty_context(),
            &classification(Tone::Flirty),
            ChatKind::Private,
            "what's the weather like",
            8,
        )
        .unwrap();
        assert!(msgs[0].content.contains("strictly non-romantic"));
    }

    #[test]
    fn flirting_unlocks_only_with_config_tone_and_signal() {
        let mut persona = PersonaConfig::default();
        persona.flirting_allowed = true;
        let msgs = build_messages(
            &persona,
            &empty_context(),
            &classification(Tone::Flirty),
            ChatKind::Private,
            "hey cutie, miss you <3",
            8,
        )
        .unwrap();
        assert!(msgs[0].content.contains("lightly flirty"));
    }

    #[test]
    fn group_chat_gets_group_rules() {
        let msgs = build_messages(
            &PersonaConfig::default(),
            &empty_context(),
            &classification(Tone::Neutral),
            ChatKind::Group,
            "hi all",
            8,
        )
        .unwrap();
        assert!(msgs[0].content.contains("group chat"));
    }

    #[test]
    fn every_tone_has_an_instruction() {
        let tones = [
            Tone::Neutral,
            Tone::Casual,
            Tone::Excited,
            Tone::Sad,
            Tone::Formal,
            Tone::Flirty,
            Tone::Unknown,
        ];
        for tone in tones {
            assert!(!tone_instruction(tone).is_empty());
        }
    }
}

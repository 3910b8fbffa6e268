//! Canned on-persona replies for when the backend is unavailable. The
//! user gets one of these, never a technical error.

use rand::Rng;

use crate::types::Tone;

const FORMAL_POOL: &[&str] = &[
    "I apologize, I'm having difficulty processing that right now.",
    "Could you please rephrase that for me?",
    "I'm experiencing a brief hiccup at the moment — one more try?",
];

const CASUAL_POOL: &[&str] = &[
    "Sorry, my brain's having a moment! Can you try that again?",
    "Hmm, I'm not sure I caught that. What were you saying?",
    "Oops, something glitched on my end. Mind rephrasing?",
    "My thoughts are a bit scattered right now. Could you repeat that?",
];

/// Pick a degraded-mode reply matching the user's register, optionally
/// personalized with their name.
pub fn reply(tone: Tone, sender: Option<&str>) -> String {
    let pool = if tone == Tone::Formal { FORMAL_POOL } else { CASUAL_POOL };
    let line = pool[rand::rng().random_range(0..pool.len())];
    match sender {
        Some(name) if tone != Tone::Formal => format!("{name}, {}", lowercase_first(line)),
        _ => line.to_owned(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formal_tone_draws_from_formal_pool() {
        for _ in 0..20 {
            let line = reply(Tone::Formal, None);
            assert!(FORMAL_POOL.contains(&line.as_str()));
        }
    }

    #[test]
    fn other_tones_draw_from_casual_pool() {
        for tone in [Tone::Neutral, Tone::Casual, Tone::Excited, Tone::Sad, Tone::Unknown] {
            let line = reply(tone, None);
            assert!(CASUAL_POOL.contains(&line.as_str()));
        }
    }

    #[test]
    fn sender_name_personalizes_casual_replies() {
        let line = reply(Tone::Casual, Some("Ana"));
        assert!(line.starts_with("Ana, "));
    }

    #[test]
    fn formal_replies_stay_impersonal() {
        let line = reply(Tone::Formal, Some("Ana"));
        assert!(!line.starts_with("Ana"));
    }

    #[test]
    fn lowercase_first_handles_unicode() {
        assert_eq!(lowercase_first("Über cool"), "über cool");
        assert_eq!(lowercase_first(""), "");
    }
}

//! Keyword/punctuation tone scan. Each register accumulates a score from
//! its cue table; the highest score wins and no cues at all mean neutral.

use crate::types::Tone;

const FORMAL_WORDS: &[&str] = &[
    "sir", "madam", "kindly", "regards", "appreciate", "furthermore", "however", "nevertheless",
    "therefore", "sincerely",
];
const FORMAL_PHRASES: &[&str] = &["would you", "could you", "may i", "thank you very much", "i am writing to"];

const CASUAL_WORDS: &[&str] = &[
    "lol", "haha", "omg", "tbh", "ngl", "btw", "imo", "yeah", "yep", "nah", "gonna", "wanna",
    "gotta",
];

const EXCITED_WORDS: &[&str] =
    &["awesome", "amazing", "fantastic", "incredible", "excited", "yay", "wow", "woohoo"];

const SAD_WORDS: &[&str] =
    &["sad", "sorry", "worried", "concerned", "upset", "disappointed", "lonely", "crying"];

const FLIRTY_WORDS: &[&str] = &[
    "cute", "cutie", "handsome", "gorgeous", "sweetheart", "darling", "crush", "kiss", "flirt",
    "romantic", "xoxo",
];
const FLIRTY_PHRASES: &[&str] = &["love you", "miss you", "date me", "my love", "<3"];

/// Detect the dominant tone of `text`. No cue match yields `Neutral`.
pub fn detect(text: &str) -> Tone {
    let lower = text.to_lowercase();
    let words: Vec<&str> =
        lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();

    let formal = count_words(&words, FORMAL_WORDS) * 2 + count_phrases(&lower, FORMAL_PHRASES) * 2;
    let casual = count_words(&words, CASUAL_WORDS) * 2;
    let excited = count_words(&words, EXCITED_WORDS) * 2 + exclamation_cues(text);
    let sad = count_words(&words, SAD_WORDS) * 2 + ellipsis_cues(&lower);
    let flirty = count_words(&words, FLIRTY_WORDS) * 2 + count_phrases(&lower, FLIRTY_PHRASES) * 2;

    // Fixed priority order keeps ties deterministic.
    let scored = [
        (Tone::Formal, formal),
        (Tone::Casual, casual),
        (Tone::Excited, excited),
        (Tone::Sad, sad),
        (Tone::Flirty, flirty),
    ];
    let mut best = (Tone::Neutral, 0usize);
    for (tone, score) in scored {
        if score > best.1 {
            best = (tone, score);
        }
    }
    best.0
}

/// True when the user text itself carries a romantic opener. The prompt
/// composer requires this on top of the flirty tone before it will ever
/// unlock the romantic register.
pub fn user_initiated_flirtation(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words: Vec<&str> =
        lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    count_words(&words, FLIRTY_WORDS) + count_phrases(&lower, FLIRTY_PHRASES) > 0
}

fn count_words(words: &[&str], table: &[&str]) -> usize {
    words.iter().filter(|w| table.contains(w)).count()
}

fn count_phrases(lower: &str, table: &[&str]) -> usize {
    table.iter().filter(|p| lower.contains(*p)).count()
}

/// Exclamation marks and SHOUTED words read as excitement.
fn exclamation_cues(text: &str) -> usize {
    let bangs = text.chars().filter(|c| *c == '!').count();
    let shouted = text
        .split_whitespace()
        .filter(|w| w.len() >= 3 && w.chars().all(|c| c.is_ascii_uppercase()))
        .count();
    bangs + shouted * 2
}

/// Trailing ellipses read as dejection.
fn ellipsis_cues(lower: &str) -> usize {
    lower.matches("...").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cues_is_neutral() {
        assert_eq!(detect("the meeting moved to tuesday"), Tone::Neutral);
        assert_eq!(detect(""), Tone::Neutral);
    }

    #[test]
    fn formal_phrases_win() {
        assert_eq!(detect("Could you kindly forward the report, sir"), Tone::Formal);
    }

    #[test]
    fn casual_slang_wins() {
        assert_eq!(detect("lol yeah gonna check it tbh"), Tone::Casual);
    }

    #[test]
    fn exclamations_read_excited() {
        assert_eq!(detect("that is awesome!!!"), Tone::Excited);
        assert_eq!(detect("WOW this WORKS"), Tone::Excited);
    }

    #[test]
    fn sad_keywords_and_ellipsis() {
        assert_eq!(detect("i'm so sad and disappointed..."), Tone::Sad);
    }

    #[test]
    fn flirty_keywords() {
        assert_eq!(detect("hey cutie, miss you <3"), Tone::Flirty);
    }

    #[test]
    fn keyword_outweighs_single_bang() {
        // One exclamation mark should not beat two explicit sad cues
        assert_eq!(detect("sorry, feeling really sad today!"), Tone::Sad);
    }

    #[test]
    fn flirt_initiation_signal() {
        assert!(user_initiated_flirtation("you're such a cutie"));
        assert!(!user_initiated_flirtation("what time is the meeting"));
    }

    #[test]
    fn deterministic_for_fixed_input() {
        let text = "lol awesome!!! sorry...";
        assert_eq!(detect(text), detect(text));
    }
}

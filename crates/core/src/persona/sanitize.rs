//! Strips AI artifacts from raw model output and clips replies to the
//! chat-mode length budget. Pure string transform; idempotent by design
//! so re-sanitizing an already-clean reply changes nothing.

use crate::types::ChatKind;

/// Sentences containing any of these are dropped wholesale. Matching is
/// case-insensitive substring. Data, not logic: swap the list freely.
const DISCLOSURE_PHRASES: &[&str] = &[
    "as an ai",
    "i'm an ai",
    "i am an ai",
    "as a language model",
    "as a digital assistant",
    "i'm a chatbot",
    "i'm a bot",
    "i'm an assistant",
    "i am an assistant",
    "i'm designed to",
    "i'm programmed to",
    "i was created to",
    "my purpose is",
    "i don't have feelings",
    "i can't feel emotions",
    "i don't have personal opinions",
    "i don't have personal experiences",
    "i'm here to help",
    "how can i assist",
    "is there anything else you'd like",
];

/// Survivors shorter than this read as blank and get the fallback line.
const MIN_SURVIVOR_CHARS: usize = 4;

/// Configured reply cleaner. One instance per relay, built from the
/// persona's fallback line and the chat-mode length limits.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    phrases: Vec<String>,
    fallback_line: String,
    private_limit: usize,
    group_limit: usize,
}

impl Sanitizer {
    pub fn new(fallback_line: impl Into<String>, private_limit: usize, group_limit: usize) -> Self {
        Self::with_phrases(
            DISCLOSURE_PHRASES.iter().map(|p| (*p).to_owned()).collect(),
            fallback_line,
            private_limit,
            group_limit,
        )
    }

    /// Build with a custom phrase list (lowercased for matching).
    pub fn with_phrases(
        phrases: Vec<String>,
        fallback_line: impl Into<String>,
        private_limit: usize,
        group_limit: usize,
    ) -> Self {
        Self {
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
            fallback_line: fallback_line.into(),
            private_limit,
            group_limit,
        }
    }

    /// Clean a raw model reply for delivery.
    pub fn sanitize(&self, raw: &str, chat: ChatKind) -> String {
        let text = raw.replace('*', "");
        let text = cap_punctuation_runs(&collapse_whitespace(&text));
        let text = self.drop_disclosures(&text);
        let text = if text.trim().chars().count() < MIN_SURVIVOR_CHARS {
            self.fallback_line.clone()
        } else {
            text
        };
        let limit = match chat {
            ChatKind::Private => self.private_limit,
            ChatKind::Group => self.group_limit,
        };
        truncate(text.trim(), limit)
    }

    /// Drop every sentence that contains a blocked phrase.
    fn drop_disclosures(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        if !self.phrases.iter().any(|p| lower.contains(p)) {
            return text.to_owned();
        }
        text.split(". ")
            .filter(|sentence| {
                let s = sentence.to_lowercase();
                !self.phrases.iter().any(|p| s.contains(p))
            })
            .collect::<Vec<_>>()
            .join(". ")
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap shouty punctuation: at most `!!`, `??` and `...`.
fn cap_punctuation_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run_char = '\0';
    let mut run_len = 0usize;
    for c in s.chars() {
        if c == run_char {
            run_len += 1;
        } else {
            run_char = c;
            run_len = 1;
        }
        let cap = match c {
            '!' | '?' => 2,
            '.' => 3,
            _ => usize::MAX,
        };
        if run_len <= cap {
            out.push(c);
        }
    }
    out
}

/// Clip to `limit` chars at a sentence boundary when one falls late
/// enough, else at the last word boundary. Never mid-word.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    if let Some(pos) = cut.rfind(". ") {
        if pos * 2 >= cut.len() {
            return cut[..pos + 1].to_owned();
        }
    }
    let head = match cut.rfind(' ') {
        Some(pos) if pos * 2 >= cut.len() => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}...", head.trim_end())
}

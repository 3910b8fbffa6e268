//! Best-effort language inference: script ranges for non-Latin scripts,
//! stop-word scoring for Latin-script languages. Returns `None` on
//! ambiguous input instead of guessing.

/// Minimum share of alphabetic chars a script needs to claim the text.
const SCRIPT_SHARE: f32 = 0.3;
/// Minimum stop-word hits before a Latin-script language is trusted.
const MIN_STOPWORD_HITS: usize = 2;

const STOPWORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "is", "are", "you", "was", "have", "not", "what", "with", "this"]),
    ("es", &["el", "la", "que", "de", "no", "es", "por", "los", "una", "para", "como"]),
    ("fr", &["le", "la", "les", "est", "pas", "que", "des", "une", "dans", "pour", "vous"]),
    ("de", &["der", "die", "das", "und", "ist", "nicht", "ich", "ein", "mit", "auf", "sie"]),
    ("pt", &["o", "que", "nao", "um", "uma", "com", "para", "mais", "isso", "voce", "muito"]),
    ("it", &["il", "che", "di", "non", "per", "una", "sono", "con", "come", "questo", "ma"]),
];

/// Detect the dominant language of `text`, or `None` when unsure.
pub fn detect(text: &str) -> Option<&'static str> {
    if let Some(code) = detect_script(text) {
        return Some(code);
    }
    detect_latin(text)
}

/// Non-Latin scripts identify a language directly by char ranges.
fn detect_script(text: &str) -> Option<&'static str> {
    let mut alphabetic = 0usize;
    let mut cyrillic = 0usize;
    let mut arabic = 0usize;
    let mut devanagari = 0usize;
    let mut hangul = 0usize;
    let mut kana = 0usize;
    let mut han = 0usize;

    for c in text.chars().filter(|c| c.is_alphabetic()) {
        alphabetic += 1;
        match c as u32 {
            0x0400..=0x04FF => cyrillic += 1,
            0x0600..=0x06FF => arabic += 1,
            0x0900..=0x097F => devanagari += 1,
            0xAC00..=0xD7AF | 0x1100..=0x11FF => hangul += 1,
            0x3040..=0x30FF => kana += 1,
            0x4E00..=0x9FFF => han += 1,
            _ => {}
        }
    }
    if alphabetic == 0 {
        return None;
    }

    let dominant = |count: usize| count as f32 / alphabetic as f32 >= SCRIPT_SHARE;
    // Kana outranks Han: Japanese text mixes both scripts.
    if dominant(kana) {
        Some("ja")
    } else if dominant(hangul) {
        Some("ko")
    } else if dominant(han) {
        Some("zh")
    } else if dominant(cyrillic) {
        Some("ru")
    } else if dominant(arabic) {
        Some("ar")
    } else if dominant(devanagari) {
        Some("hi")
    } else {
        None
    }
}

/// Latin-script languages are told apart by stop-word frequency. The
/// winner needs a clear margin over the runner-up.
fn detect_latin(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return None;
    }

    let mut scores: Vec<(&'static str, usize)> = STOPWORDS
        .iter()
        .map(|(code, stopwords)| (*code, words.iter().filter(|w| stopwords.contains(w)).count()))
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (code, top) = scores[0];
    let runner_up = scores[1].1;
    // A tie means the text is ambiguous; refuse to guess.
    if top >= MIN_STOPWORD_HITS && top > runner_up { Some(code) } else { None }
}

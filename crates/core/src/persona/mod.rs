pub mod fallback;
pub mod prompt;
pub mod sanitize;

pub use sanitize::Sanitizer;

/// Persona configuration problems are deployment mistakes, fatal at
/// startup, never patched over per message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("persona field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// Identity and behavior knobs for the bot persona. The identity fields
/// are mandatory: every prompt the composer emits carries them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PersonaConfig {
    pub bot_name: String,
    pub owner_name: String,
    /// One-line character description woven into the system prompt.
    pub description: String,
    /// Community the persona claims as home, if any.
    pub home_group: Option<String>,
    pub flirting_allowed: bool,
    /// On-persona line substituted when sanitizing strips a reply bare.
    pub fallback_line: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            bot_name: "June".into(),
            owner_name: "the admin".into(),
            description: "a friendly and natural conversationalist".into(),
            home_group: None,
            flirting_allowed: false,
            fallback_line: "Hmm, my head's a bit fuzzy right now — say that again?".into(),
        }
    }
}

impl PersonaConfig {
    /// Load persona fields from `BANTER_*` environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bot_name: env_or("BANTER_BOT_NAME", d.bot_name),
            owner_name: env_or("BANTER_OWNER_NAME", d.owner_name),
            description: env_or("BANTER_PERSONALITY", d.description),
            home_group: std::env::var("BANTER_HOME_GROUP").ok().filter(|v| !v.trim().is_empty()),
            flirting_allowed: std::env::var("BANTER_FLIRTING_ALLOWED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.flirting_allowed),
            fallback_line: env_or("BANTER_FALLBACK_LINE", d.fallback_line),
        }
    }

    /// Reject blank identity fields. An unbranded prompt is worse than a
    /// refusal to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("bot_name"));
        }
        if self.owner_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("owner_name"));
        }
        if self.description.trim().is_empty() {
            return Err(ConfigError::EmptyField("description"));
        }
        if self.fallback_line.trim().is_empty() {
            return Err(ConfigError::EmptyField("fallback_line"));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

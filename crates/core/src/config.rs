/// All banter tunables. Loaded from `BANTER_*` environment variables at
/// startup; unset or unparseable values fall back to the defaults.
#[derive(Debug, Clone)]
pub struct BanterCfg {
    // conversation context
    pub max_context_turns: usize,
    pub context_timeout_hours: i64,
    /// How many trailing turns are shown to the model.
    pub prompt_history_turns: usize,

    // AI call path
    pub ai_timeout_secs: u64,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,

    // circuit breaker
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: u64,

    // reply shaping
    pub private_reply_limit: usize,
    pub group_reply_limit: usize,

    // broadcast fan-out
    pub broadcast_concurrency: usize,
    pub broadcast_batch_delay_ms: u64,

    // classifier fallback
    pub default_language: String,
}

impl Default for BanterCfg {
    fn default() -> Self {
        Self {
            max_context_turns: 20,
            context_timeout_hours: 2,
            prompt_history_turns: 8,
            ai_timeout_secs: 30,
            ai_max_tokens: 500,
            ai_temperature: 0.9,
            breaker_threshold: 5,
            breaker_cooldown_secs: 300,
            private_reply_limit: 1000,
            group_reply_limit: 400,
            broadcast_concurrency: 20,
            broadcast_batch_delay_ms: 200,
            default_language: "en".into(),
        }
    }
}

impl BanterCfg {
    /// Load config from environment, falling back to defaults per field.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_context_turns: get_or("BANTER_MAX_CONTEXT_TURNS", d.max_context_turns),
            context_timeout_hours: get_or("BANTER_CONTEXT_TIMEOUT_HOURS", d.context_timeout_hours),
            prompt_history_turns: get_or("BANTER_PROMPT_HISTORY_TURNS", d.prompt_history_turns),
            ai_timeout_secs: get_or("BANTER_AI_TIMEOUT_SECS", d.ai_timeout_secs),
            ai_max_tokens: get_or("BANTER_AI_MAX_TOKENS", d.ai_max_tokens),
            ai_temperature: get_or("BANTER_AI_TEMPERATURE", d.ai_temperature),
            breaker_threshold: get_or("BANTER_BREAKER_THRESHOLD", d.breaker_threshold),
            breaker_cooldown_secs: get_or("BANTER_BREAKER_COOLDOWN_SECS", d.breaker_cooldown_secs),
            private_reply_limit: get_or("BANTER_PRIVATE_REPLY_LIMIT", d.private_reply_limit),
            group_reply_limit: get_or("BANTER_GROUP_REPLY_LIMIT", d.group_reply_limit),
            broadcast_concurrency: get_or("BANTER_BROADCAST_CONCURRENCY", d.broadcast_concurrency),
            broadcast_batch_delay_ms: get_or(
                "BANTER_BROADCAST_BATCH_DELAY_MS",
                d.broadcast_batch_delay_ms,
            ),
            default_language: get_or("BANTER_DEFAULT_LANGUAGE", d.default_language),
        }
    }
}

fn get_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

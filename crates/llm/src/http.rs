//! HTTP-based LLM providers.
//!
//! Supports OpenAI-compatible APIs (OpenAI, Google Gemini, DeepSeek, etc.)
//! and Anthropic's native Messages API. Multiple API keys can be supplied;
//! the provider rotates to the next key when the current one is rate
//! limited and gives up once a full cycle has been exhausted.

use crate::provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, Role};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Inferred provider kind from model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    OpenAi,
    Anthropic,
    /// Falls back to OpenAI-compatible format.
    Unknown,
}

impl ProviderKind {
    /// Infer provider from model name prefix.
    pub fn from_model(model: &str) -> Self {
        let m = model.to_lowercase();
        if m.starts_with("gemini-") {
            Self::Google
        } else if m.starts_with("gpt-") || m.starts_with("o1-") || m.starts_with("o3-") {
            Self::OpenAi
        } else if m.starts_with("claude-") {
            Self::Anthropic
        } else {
            Self::Unknown
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::OpenAi | Self::Unknown => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    fn is_anthropic(self) -> bool {
        matches!(self, Self::Anthropic)
    }
}

// ── OpenAI-compatible request/response types ──

#[derive(Serialize)]
struct OaiRequest {
    model: String,
    messages: Vec<OaiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OaiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OaiResponse {
    choices: Vec<OaiChoice>,
    usage: Option<OaiUsage>,
}

#[derive(Deserialize)]
struct OaiChoice {
    message: OaiChoiceMessage,
}

#[derive(Deserialize)]
struct OaiChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct OaiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── Anthropic Messages API types ──

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ── Provider ──

/// HTTP-based LLM provider with API key rotation.
pub struct HttpProvider {
    kind: ProviderKind,
    model: String,
    client: reqwest::Client,
    base_url: String,
    api_keys: Vec<String>,
    current_key: AtomicUsize,
}

impl HttpProvider {
    /// Build from model name + API keys + optional base URL override.
    /// At least one key is required.
    pub fn new(model: String, api_keys: Vec<String>, base_url: Option<String>) -> Self {
        assert!(!api_keys.is_empty(), "at least one API key required");
        let kind = ProviderKind::from_model(&model);
        let base = base_url.unwrap_or_else(|| kind.default_base_url().to_owned());
        Self {
            kind,
            model,
            client: reqwest::Client::new(),
            base_url: base.trim_end_matches('/').to_owned(),
            api_keys,
            current_key: AtomicUsize::new(0),
        }
    }

    fn endpoint(&self) -> String {
        if self.kind.is_anthropic() {
            format!("{}/v1/messages", self.base_url)
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn active_key(&self) -> &str {
        let idx = self.current_key.load(Ordering::Relaxed) % self.api_keys.len();
        &self.api_keys[idx]
    }

    /// Advance to the next key after a rate limit.
    fn rotate_key(&self) {
        let old = self.current_key.fetch_add(1, Ordering::Relaxed) % self.api_keys.len();
        let new = (old + 1) % self.api_keys.len();
        tracing::warn!(
            from = %redact(&self.api_keys[old]),
            to = %redact(&self.api_keys[new]),
            "rotating API key after rate limit"
        );
    }
}

/// First six characters of a key, for log lines.
fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{prefix}...")
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Parse error response, returning RateLimited for 429.
fn check_error(status: reqwest::StatusCode, body: String) -> LlmError {
    if status.as_u16() == 429 {
        LlmError::RateLimited
    } else {
        LlmError::RequestFailed(format!("{status}: {body}"))
    }
}

impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Unknown => "unknown",
        }
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        Box::pin(async move {
            // One attempt per key; rotate on rate limit only.
            for _ in 0..self.api_keys.len() {
                let result = if self.kind.is_anthropic() {
                    self.complete_anthropic(&request).await
                } else {
                    self.complete_openai(&request).await
                };
                match result {
                    Err(LlmError::RateLimited) => self.rotate_key(),
                    other => return other,
                }
            }
            Err(LlmError::KeysExhausted)
        })
    }
}

impl HttpProvider {
    /// OpenAI-compatible completion (OpenAI, Gemini, Unknown).
    async fn complete_openai(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let body = OaiRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OaiMessage { role: role_str(&m.role), content: m.content.clone() })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.active_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        let api: OaiResponse =
            resp.json().await.map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content = api.choices.into_iter().next().map(|c| c.message.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        let (input_tokens, output_tokens) =
            api.usage.map(|u| (u.prompt_tokens, u.completion_tokens)).unwrap_or((0, 0));

        Ok(CompletionResponse { content, input_tokens, output_tokens })
    }

    /// Anthropic Messages API completion.
    async fn complete_anthropic(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        // Extract system message separately (Anthropic puts it at top level).
        let mut system = None;
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter_map(|m| {
                if m.role == Role::System {
                    system = Some(m.content.clone());
                    None
                } else {
                    Some(AnthropicMessage { role: role_str(&m.role), content: m.content.clone() })
                }
            })
            .collect();

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system,
            messages,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.active_key())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        let api: AnthropicResponse =
            resp.json().await.map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content: String =
            api.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join("");
        if content.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        let (input_tokens, output_tokens) =
            api.usage.map(|u| (u.input_tokens, u.output_tokens)).unwrap_or((0, 0));

        Ok(CompletionResponse { content, input_tokens, output_tokens })
    }
}

/// Build an LlmProvider from environment variables.
/// Reads `BANTER_LLM_MODEL`, `BANTER_LLM_API_KEYS` (comma-separated, or
/// `BANTER_LLM_API_KEY` for a single key), optionally `BANTER_LLM_BASE_URL`.
/// Returns `None` if model or keys are not set.
pub fn from_env() -> Option<HttpProvider> {
    let model = std::env::var("BANTER_LLM_MODEL").ok()?;
    let keys: Vec<String> = std::env::var("BANTER_LLM_API_KEYS")
        .or_else(|_| std::env::var("BANTER_LLM_API_KEY"))
        .ok()?
        .split(',')
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return None;
    }
    let base_url = std::env::var("BANTER_LLM_BASE_URL").ok();
    Some(HttpProvider::new(model, keys, base_url))
}

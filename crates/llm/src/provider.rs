use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Completion request sent to a provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Completion response from a provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("empty completion")]
    EmptyCompletion,
    #[error("all api keys exhausted")]
    KeysExhausted,
}

/// Trait for chat-completion providers (Gemini, OpenAI, Claude, etc.)
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>>;
}

/// Mock provider for testing — returns a fixed response.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub response: String,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        let content = self.response.clone();
        Box::pin(async move {
            Ok(CompletionResponse { content, input_tokens: 10, output_tokens: 20 })
        })
    }
}

/// Scripted provider for testing — replays a fixed outcome sequence and
/// counts how many times it was actually invoked. The last outcome
/// repeats once the script is drained.
pub struct ScriptedProvider {
    outcomes: std::sync::Mutex<Vec<Result<String, String>>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, String>>) -> Self {
        assert!(!outcomes.is_empty(), "script needs at least one outcome");
        Self {
            outcomes: std::sync::Mutex::new(outcomes),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A provider that fails every call.
    pub fn always_failing() -> Self {
        Self::new(vec![Err("backend down".into())])
    }

    /// Number of times `complete` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let outcome = {
            let mut script = self.outcomes.lock().unwrap();
            if script.len() > 1 { script.remove(0) } else { script[0].clone() }
        };
        Box::pin(async move {
            match outcome {
                Ok(content) => {
                    Ok(CompletionResponse { content, input_tokens: 10, output_tokens: 20 })
                }
                Err(msg) => Err(LlmError::RequestFailed(msg)),
            }
        })
    }
}

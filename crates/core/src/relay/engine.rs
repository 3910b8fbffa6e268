//! The relay engine: one inbound message in, one on-persona reply out.
//!
//! Pipeline: sweep/get context → classify → compose → breaker-gated,
//! timeout-wrapped backend call → sanitize → context update. Backend
//! trouble degrades to a canned on-persona reply, never a technical
//! error. The engine is driven by a single worker, so `&mut self` is the
//! serialization point for both the context store and the breaker.

use std::sync::Arc;
use std::time::Duration;

use banter_llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use chrono::Utc;

use super::breaker::{BreakerStatus, CircuitBreaker};
use crate::broadcast::{
    BroadcastError, BroadcastJob, BroadcastTracker, OutboundSender, RecipientRegistry,
    TargetFilter,
};
use crate::classify;
use crate::config::BanterCfg;
use crate::context::ContextStore;
use crate::persona::{fallback, prompt, ConfigError, PersonaConfig, Sanitizer};
use crate::types::{Classification, InboundMessage, OutgoingReply, TurnRole};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("persona configuration invalid: {0}")]
    Config(#[from] ConfigError),
}

/// Snapshot of relay internals for the owner stats surface.
#[derive(Debug, Clone, Copy)]
pub struct RelayStats {
    pub contexts: usize,
    pub total_turns: usize,
    pub breaker: BreakerStatus,
    pub breaker_failures: u32,
}

impl RelayStats {
    pub fn summary(&self) -> String {
        format!(
            "{} active contexts, {} stored turns, circuit {} ({} consecutive failures)",
            self.contexts,
            self.total_turns,
            self.breaker.as_str(),
            self.breaker_failures,
        )
    }
}

/// Owns the conversation store, the shared circuit breaker and the
/// broadcast tracker; consulted, never bypassed, for every AI call.
pub struct Relay {
    cfg: Arc<BanterCfg>,
    persona: PersonaConfig,
    store: ContextStore,
    breaker: CircuitBreaker,
    sanitizer: Sanitizer,
    tracker: BroadcastTracker,
    provider: Option<Arc<dyn LlmProvider>>,
    registry: Arc<dyn RecipientRegistry>,
    outbound: Arc<dyn OutboundSender>,
}

impl Relay {
    pub fn new(
        cfg: Arc<BanterCfg>,
        persona: PersonaConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        registry: Arc<dyn RecipientRegistry>,
        outbound: Arc<dyn OutboundSender>,
    ) -> Self {
        let sanitizer = Sanitizer::new(
            persona.fallback_line.clone(),
            cfg.private_reply_limit,
            cfg.group_reply_limit,
        );
        let store = ContextStore::new(cfg.max_context_turns, cfg.context_timeout_hours);
        let breaker = CircuitBreaker::with_params(cfg.breaker_threshold, cfg.breaker_cooldown_secs);
        let tracker = BroadcastTracker::new(cfg.broadcast_concurrency, cfg.broadcast_batch_delay_ms);
        Self { cfg, persona, store, breaker, sanitizer, tracker, provider, registry, outbound }
    }

    /// Handle one inbound message and produce the reply for it.
    pub async fn handle_message(
        &mut self,
        msg: &InboundMessage,
    ) -> Result<OutgoingReply, RelayError> {
        let now = Utc::now();
        self.store.sweep_expired(now);

        let classification = {
            let ctx = self.store.get_or_create(&msg.conversation, now);
            let c = classify::classify(&msg.text, &ctx.language, &self.cfg.default_language);
            ctx.language = c.language.clone();
            ctx.tone = c.tone;
            c
        };

        // Compose against the history *before* this turn, then record it.
        let messages = {
            let ctx = self.store.get_or_create(&msg.conversation, now);
            prompt::build_messages(
                &self.persona,
                ctx,
                &classification,
                msg.chat,
                &msg.text,
                self.cfg.prompt_history_turns,
            )?
        };
        self.store.append_turn(&msg.conversation, TurnRole::User, &msg.text, now);
        self.registry.record_activity(&msg.conversation, msg.chat).await;

        let text = self.generate(messages, &classification, msg).await;
        Ok(OutgoingReply::new(msg.conversation.clone(), text))
    }

    /// Fan a message out to the registered recipients.
    pub async fn broadcast(
        &self,
        text: &str,
        filter: TargetFilter,
    ) -> Result<BroadcastJob, BroadcastError> {
        self.tracker.dispatch(&self.registry, &self.outbound, text, filter).await
    }

    pub fn stats(&self) -> RelayStats {
        let store = self.store.stats();
        RelayStats {
            contexts: store.contexts,
            total_turns: store.total_turns,
            breaker: self.breaker.status(),
            breaker_failures: self.breaker.consecutive_failures(),
        }
    }

    /// Run the breaker-gated backend call. Any error, timeout or empty
    /// completion counts as a breaker failure and degrades to a canned
    /// reply; successful replies are sanitized and recorded.
    async fn generate(
        &mut self,
        messages: Vec<ChatMessage>,
        classification: &Classification,
        msg: &InboundMessage,
    ) -> String {
        let sender = msg.sender.as_deref();

        let Some(provider) = self.provider.clone() else {
            tracing::warn!("no LLM provider configured, serving fallback reply");
            return fallback::reply(classification.tone, sender);
        };

        if !self.breaker.try_acquire() {
            tracing::debug!(
                conversation = %msg.conversation,
                "circuit open, fallback reply without backend call"
            );
            return fallback::reply(classification.tone, sender);
        }

        let request = CompletionRequest {
            messages,
            max_tokens: self.cfg.ai_max_tokens,
            temperature: self.cfg.ai_temperature,
        };
        let timeout = Duration::from_secs(self.cfg.ai_timeout_secs);

        match tokio::time::timeout(timeout, provider.complete(request)).await {
            Ok(Ok(resp)) if !resp.content.trim().is_empty() => {
                self.breaker.record_success();
                let clean = self.sanitizer.sanitize(&resp.content, msg.chat);
                self.store.append_turn(
                    &msg.conversation,
                    TurnRole::Assistant,
                    &clean,
                    Utc::now(),
                );
                tracing::info!(
                    conversation = %msg.conversation,
                    language = %classification.language,
                    tone = classification.tone.as_str(),
                    "reply generated"
                );
                clean
            }
            Ok(Ok(_)) => {
                tracing::warn!("backend returned an empty completion");
                self.breaker.record_failure();
                fallback::reply(classification.tone, sender)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "backend call failed");
                self.breaker.record_failure();
                fallback::reply(classification.tone, sender)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.cfg.ai_timeout_secs,
                    "backend call timed out"
                );
                self.breaker.record_failure();
                fallback::reply(classification.tone, sender)
            }
        }
    }
}

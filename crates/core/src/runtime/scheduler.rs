use std::sync::Arc;

use async_trait::async_trait;
use banter_llm::provider::LlmProvider;
use tokio_util::sync::CancellationToken;

use super::shutdown::ShutdownGuard;
use crate::broadcast::{OutboundSender, RecipientRegistry, SendOutcome};
use crate::config::BanterCfg;
use crate::io::input::{InboundEvent, InputReceiver, InputSender};
use crate::io::output::{OutputReceiver, OutputSender};
use crate::persona::PersonaConfig;
use crate::relay::Relay;
use crate::types::{ConversationId, OutgoingReply};

/// Outbound sender that delivers through the runtime's output channel.
/// The REPL front-end and tests consume replies from the same stream the
/// relay uses for normal messages.
struct ChannelSender {
    tx: OutputSender,
}

#[async_trait]
impl OutboundSender for ChannelSender {
    async fn send(&self, recipient: &ConversationId, text: &str) -> SendOutcome {
        match self.tx.send(OutgoingReply::new(recipient.clone(), text)).await {
            Ok(()) => SendOutcome::Sent,
            Err(_) => SendOutcome::Failed,
        }
    }
}

/// Single-worker runtime: drains inbound events in arrival order, which
/// keeps turns within one conversation serialized.
pub struct Runtime {
    shutdown: ShutdownGuard,
    event_rx: InputReceiver,
    output_tx: OutputSender,
    relay: Relay,
}

impl Runtime {
    /// Create a new Runtime. Returns (Runtime, event_sender,
    /// output_receiver): push `InboundEvent`s into the sender, consume
    /// replies from the receiver.
    pub fn new(
        cfg: Arc<BanterCfg>,
        persona: PersonaConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        registry: Arc<dyn RecipientRegistry>,
    ) -> (Self, InputSender, OutputReceiver) {
        let (event_tx, event_rx) = crate::io::input::channel(256);
        let (output_tx, output_rx) = crate::io::output::channel(64);
        let outbound: Arc<dyn OutboundSender> =
            Arc::new(ChannelSender { tx: output_tx.clone() });
        let relay = Relay::new(cfg, persona, provider, registry, outbound);
        let runtime = Self { shutdown: ShutdownGuard::new(), event_rx, output_tx, relay };
        (runtime, event_tx, output_rx)
    }

    /// Returns the cancellation token for coordinating with the caller.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    /// Start the signal listener and process events until cancelled.
    pub async fn run(&mut self) {
        self.shutdown.spawn_signal_listener();
        let token = self.shutdown.token();
        tracing::info!("banter runtime started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("shutdown signal received, exiting event loop");
                    break;
                }
                event = self.event_rx.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event).await;
                }
            }
        }

        tracing::info!("banter runtime stopped");
    }

    async fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Message(msg) => match self.relay.handle_message(&msg).await {
                Ok(reply) => self.send_reply(reply).await,
                // Misconfiguration: refuse to answer rather than emit an
                // unbranded reply.
                Err(e) => tracing::error!(error = %e, "dropping message"),
            },
            InboundEvent::Broadcast { text, filter, reply_to } => {
                let summary = match self.relay.broadcast(&text, filter).await {
                    Ok(job) => job.summary(),
                    Err(e) => format!("broadcast failed: {e}"),
                };
                self.send_reply(OutgoingReply::new(reply_to, summary)).await;
            }
            InboundEvent::Stats { reply_to } => {
                let summary = self.relay.stats().summary();
                self.send_reply(OutgoingReply::new(reply_to, summary)).await;
            }
        }
    }

    async fn send_reply(&self, reply: OutgoingReply) {
        if self.output_tx.send(reply).await.is_err() {
            tracing::warn!("output channel closed, reply dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{InMemoryRegistry, TargetFilter};
    use crate::io::input;
    use crate::types::InboundMessage;
    use banter_llm::provider::MockProvider;

    fn start_runtime() -> (InputSender, OutputReceiver, CancellationToken, tokio::task::JoinHandle<()>)
    {
        let registry: Arc<dyn RecipientRegistry> = Arc::new(InMemoryRegistry::new());
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("hello from the bot"));
        let (mut runtime, tx, rx) = Runtime::new(
            Arc::new(BanterCfg::default()),
            PersonaConfig::default(),
            Some(provider),
            registry,
        );
        let token = runtime.token();
        let handle = tokio::spawn(async move { runtime.run().await });
        (tx, rx, token, handle)
    }

    #[tokio::test]
    async fn message_round_trip() {
        let (tx, mut rx, token, handle) = start_runtime();

        let msg = InboundMessage::private(ConversationId::new("c1"), None, "hi there");
        input::submit_message(&tx, msg).await.unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.conversation.as_str(), "c1");
        assert_eq!(reply.text, "hello from the bot");

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn broadcast_command_reports_a_summary() {
        let (tx, mut rx, token, handle) = start_runtime();

        // Register one conversation through normal activity
        let msg = InboundMessage::private(ConversationId::new("c1"), None, "hi");
        input::submit_message(&tx, msg).await.unwrap();
        let _reply = rx.recv().await.unwrap();

        input::submit_broadcast(&tx, "big news", TargetFilter::All, ConversationId::new("owner"))
            .await
            .unwrap();

        // One delivery to c1 plus the summary to the owner, in some order
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let (delivery, summary) = if first.conversation.as_str() == "c1" {
            (first, second)
        } else {
            (second, first)
        };
        assert_eq!(delivery.text, "big news");
        assert_eq!(summary.conversation.as_str(), "owner");
        assert!(summary.text.contains("1 sent"));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stats_command_reports_a_snapshot() {
        let (tx, mut rx, token, handle) = start_runtime();

        input::submit_stats(&tx, ConversationId::new("owner")).await.unwrap();
        let reply = rx.recv().await.unwrap();
        assert!(reply.text.contains("active contexts"));
        assert!(reply.text.contains("circuit closed"));

        token.cancel();
        handle.await.unwrap();
    }
}

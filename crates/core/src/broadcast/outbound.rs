use async_trait::async_trait;

use crate::types::ConversationId;

/// Per-recipient delivery outcome, classified by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered.
    Sent,
    /// Transient or unknown error; the recipient stays registered.
    Failed,
    /// Recipient blocked the bot or no longer exists; drop them.
    PermanentlyUnreachable,
}

/// The outbound transport collaborator.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send(&self, recipient: &ConversationId, text: &str) -> SendOutcome;
}

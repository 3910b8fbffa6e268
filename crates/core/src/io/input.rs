use tokio::sync::mpsc;

use crate::broadcast::TargetFilter;
use crate::types::{ConversationId, InboundMessage};

/// Everything the runtime reacts to: chat messages plus owner commands.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    /// Owner-issued fan-out; the summary goes back to `reply_to`.
    Broadcast { text: String, filter: TargetFilter, reply_to: ConversationId },
    /// Owner stats request; the snapshot goes back to `reply_to`.
    Stats { reply_to: ConversationId },
}

/// Input channel sender — the transport pushes events here.
pub type InputSender = mpsc::Sender<InboundEvent>;
/// Input channel receiver — the runtime consumes from here.
pub type InputReceiver = mpsc::Receiver<InboundEvent>;

/// Create an input channel with the given buffer size.
pub fn channel(buffer: usize) -> (InputSender, InputReceiver) {
    mpsc::channel(buffer)
}

/// Submit a chat message.
pub async fn submit_message(
    tx: &InputSender,
    msg: InboundMessage,
) -> Result<(), mpsc::error::SendError<InboundEvent>> {
    tx.send(InboundEvent::Message(msg)).await
}

/// Submit an owner broadcast command.
pub async fn submit_broadcast(
    tx: &InputSender,
    text: impl Into<String>,
    filter: TargetFilter,
    reply_to: ConversationId,
) -> Result<(), mpsc::error::SendError<InboundEvent>> {
    tx.send(InboundEvent::Broadcast { text: text.into(), filter, reply_to }).await
}

/// Submit an owner stats request.
pub async fn submit_stats(
    tx: &InputSender,
    reply_to: ConversationId,
) -> Result<(), mpsc::error::SendError<InboundEvent>> {
    tx.send(InboundEvent::Stats { reply_to }).await
}

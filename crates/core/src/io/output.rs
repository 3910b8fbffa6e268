use tokio::sync::mpsc;

use crate::types::OutgoingReply;

/// Output channel sender — the runtime pushes replies here.
pub type OutputSender = mpsc::Sender<OutgoingReply>;
/// Output channel receiver — the transport consumes from here.
pub type OutputReceiver = mpsc::Receiver<OutgoingReply>;

/// Create an output channel with the given buffer size.
pub fn channel(buffer: usize) -> (OutputSender, OutputReceiver) {
    mpsc::channel(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationId;

    #[tokio::test]
    async fn channel_send_recv() {
        let (tx, mut rx) = channel(4);
        tx.send(OutgoingReply::new(ConversationId::new("c"), "hello")).await.unwrap();
        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.text, "hello");
        assert_eq!(reply.conversation.as_str(), "c");
    }
}

use profai_chat::{ChatError, ChatResult, MessageId, UiSink};
use profai_llm::BoxFuture;
use tokio::sync::mpsc;

use crate::protocol::{NoticeLevel, ServerMessage};

/// Frames queued for the socket writer before `send` starts waiting.
pub const OUTGOING_BUFFER: usize = 64;

/// [`UiSink`] that queues protocol frames for a session's socket writer task.
///
/// A full queue makes the relay wait for the browser; a closed queue means the
/// writer is gone and the update is reported as dropped.
pub struct WebSocketSink {
    outgoing: mpsc::Sender<ServerMessage>,
}

impl WebSocketSink {
    pub fn new(outgoing: mpsc::Sender<ServerMessage>) -> Self {
        Self { outgoing }
    }

    pub fn channel() -> (Self, mpsc::Receiver<ServerMessage>) {
        let (outgoing, receiver) = mpsc::channel(OUTGOING_BUFFER);
        (Self::new(outgoing), receiver)
    }

    async fn deliver(&mut self, stage: &'static str, message: ServerMessage) -> ChatResult<()> {
        self.outgoing
            .send(message)
            .await
            .map_err(|_| ChatError::ui_send(stage, "websocket writer closed"))
    }
}

impl UiSink for WebSocketSink {
    fn send<'a>(&'a mut self, content: &'a str) -> BoxFuture<'a, ChatResult<MessageId>> {
        Box::pin(async move {
            let message_id = MessageId::new_v7();
            self.deliver(
                "send-message",
                ServerMessage::Message {
                    id: message_id.as_uuid(),
                    content: content.to_string(),
                },
            )
            .await?;
            Ok(message_id)
        })
    }

    fn open_message(&mut self) -> BoxFuture<'_, ChatResult<MessageId>> {
        Box::pin(async move {
            let message_id = MessageId::new_v7();
            self.deliver(
                "open-message",
                ServerMessage::MessageStart {
                    id: message_id.as_uuid(),
                },
            )
            .await?;
            Ok(message_id)
        })
    }

    fn append<'a>(
        &'a mut self,
        message_id: MessageId,
        fragment: &'a str,
    ) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            self.deliver(
                "append-token",
                ServerMessage::Token {
                    id: message_id.as_uuid(),
                    delta: fragment.to_string(),
                },
            )
            .await
        })
    }

    fn finish(&mut self, message_id: MessageId) -> BoxFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            self.deliver(
                "finish-message",
                ServerMessage::MessageEnd {
                    id: message_id.as_uuid(),
                },
            )
            .await
        })
    }

    fn send_notice<'a>(&'a mut self, notice: &'a str) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            self.deliver(
                "send-notice",
                ServerMessage::Notice {
                    level: NoticeLevel::Error,
                    content: notice.to_string(),
                },
            )
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_append_finish_share_one_id() {
        let (mut sink, mut frames) = WebSocketSink::channel();

        let message_id = sink.open_message().await.unwrap();
        sink.append(message_id, "Hel").await.unwrap();
        sink.finish(message_id).await.unwrap();

        let id = message_id.as_uuid();
        assert_eq!(frames.recv().await, Some(ServerMessage::MessageStart { id }));
        assert_eq!(
            frames.recv().await,
            Some(ServerMessage::Token {
                id,
                delta: "Hel".to_string()
            })
        );
        assert_eq!(frames.recv().await, Some(ServerMessage::MessageEnd { id }));
    }

    #[tokio::test]
    async fn closed_writer_reports_ui_send_error() {
        let (mut sink, frames) = WebSocketSink::channel();
        drop(frames);

        let error = sink.send("welcome").await.unwrap_err();
        assert!(matches!(error, ChatError::UiSend { .. }));
    }

    #[tokio::test]
    async fn notices_are_error_level() {
        let (mut sink, mut frames) = WebSocketSink::channel();

        sink.send_notice("model offline").await.unwrap();

        assert_eq!(
            frames.recv().await,
            Some(ServerMessage::Notice {
                level: NoticeLevel::Error,
                content: "model offline".to_string(),
            })
        );
    }
}

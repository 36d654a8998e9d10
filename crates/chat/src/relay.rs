use futures::{Stream, StreamExt};
use profai_llm::{ProviderResult, StreamEvent};

use crate::error::{ChatError, ChatResult};
use crate::ids::MessageId;
use crate::sink::UiSink;

/// Assistant turn under construction.
///
/// Forwards text deltas from a model stream into one open UI message while
/// accumulating the same text. The accumulator lives on the relay rather than
/// inside [`StreamRelay::run`], so a caller that abandons `run` (timeout,
/// disconnect) can still read what was produced.
#[derive(Debug, Default)]
pub struct StreamRelay {
    accumulated: String,
    message_id: Option<MessageId>,
    opened: bool,
    fragments: usize,
}

impl StreamRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn into_text(self) -> String {
        self.accumulated
    }

    /// UI message receiving fragments, if opening it succeeded.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Opens the empty placeholder message. Calling it again is a no-op.
    pub async fn open<K>(&mut self, sink: &mut K)
    where
        K: UiSink + ?Sized,
    {
        if self.opened {
            return;
        }
        self.opened = true;

        match sink.open_message().await {
            Ok(message_id) => self.message_id = Some(message_id),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "failed to open ui message; fragments will not be shown"
                );
            }
        }
    }

    /// Consumes `stream` until it ends or fails.
    ///
    /// Returns the full assistant text on exhaustion. On a stream error the
    /// partial UI message is left as is and the text gathered so far travels in
    /// [`ChatError::ModelStream`].
    pub async fn run<S, K>(&mut self, mut stream: S, sink: &mut K) -> ChatResult<String>
    where
        S: Stream<Item = ProviderResult<StreamEvent>> + Unpin,
        K: UiSink + ?Sized,
    {
        self.open(sink).await;

        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamEvent::TextDelta(fragment)) => self.forward(fragment, sink).await,
                Ok(
                    event @ (StreamEvent::ReasoningDelta(_)
                    | StreamEvent::ToolCall
                    | StreamEvent::ToolCallDelta
                    | StreamEvent::Final),
                ) => {
                    tracing::trace!(event = ?event, "ignoring non-text stream event");
                }
                Err(source) => {
                    tracing::warn!(
                        fragments = self.fragments,
                        partial_len = self.accumulated.len(),
                        error = %source,
                        "model stream failed mid-response"
                    );
                    return Err(ChatError::ModelStream {
                        stage: "relay-stream",
                        partial: self.accumulated.clone(),
                        source,
                    });
                }
            }
        }

        Ok(self.accumulated.clone())
    }

    /// Closes the UI message, if one was opened.
    pub async fn finish<K>(&mut self, sink: &mut K)
    where
        K: UiSink + ?Sized,
    {
        let Some(message_id) = self.message_id else {
            return;
        };

        if let Err(error) = sink.finish(message_id).await {
            tracing::warn!(
                message_id = %message_id,
                error = %error,
                "failed to finish ui message"
            );
        }
    }

    async fn forward<K>(&mut self, fragment: String, sink: &mut K)
    where
        K: UiSink + ?Sized,
    {
        self.accumulated.push_str(&fragment);
        self.fragments += 1;

        let Some(message_id) = self.message_id else {
            return;
        };

        if let Err(error) = sink.append(message_id, &fragment).await {
            // The fragment is still part of the accumulated answer.
            tracing::warn!(message_id = %message_id, error = %error, "dropping ui fragment");
        }
    }
}

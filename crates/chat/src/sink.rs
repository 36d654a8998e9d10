use profai_llm::BoxFuture;

use crate::error::ChatResult;
use crate::ids::MessageId;

/// Outgoing half of a chat UI session.
///
/// Every call may fail with [`crate::ChatError::UiSend`]; callers treat that as
/// a dropped update, never as a reason to end the session.
pub trait UiSink: Send {
    /// Sends one complete message.
    fn send<'a>(&'a mut self, content: &'a str) -> BoxFuture<'a, ChatResult<MessageId>>;

    /// Opens an empty message that later fragments are appended to.
    fn open_message(&mut self) -> BoxFuture<'_, ChatResult<MessageId>>;

    fn append<'a>(
        &'a mut self,
        message_id: MessageId,
        fragment: &'a str,
    ) -> BoxFuture<'a, ChatResult<()>>;

    /// Marks an open message as complete. The content stays as streamed.
    fn finish(&mut self, message_id: MessageId) -> BoxFuture<'_, ChatResult<()>>;

    /// Shows an out-of-band notice such as a failed model turn.
    fn send_notice<'a>(&'a mut self, notice: &'a str) -> BoxFuture<'a, ChatResult<()>>;
}

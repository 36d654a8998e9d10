#![deny(unsafe_code)]

/// Streaming conversation relay.
///
/// One [`SessionController`] per connected user keeps an ordered
/// [`ConversationHistory`], submits it to an [`profai_llm::LlmProvider`] and
/// relays the incremental answer into a [`UiSink`] through a [`StreamRelay`].
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod ids;
pub mod relay;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ChatConfig, DEFAULT_INSTRUCTIONS, DEFAULT_WELCOME_MESSAGE};
pub use controller::{SessionController, SessionState, TurnOutcome};
pub use error::{ChatError, ChatResult};
pub use history::{ConversationHistory, Role, SequencePolicy, Turn};
pub use ids::{MessageId, SessionId};
pub use relay::StreamRelay;
pub use sink::UiSink;

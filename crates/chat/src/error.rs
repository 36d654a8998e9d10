use std::time::Duration;

use profai_llm::ProviderError;
use snafu::Snafu;

use crate::history::Role;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("turn #{position} has role {found:?} but {expected:?} was expected"))]
    InvalidSequence {
        stage: &'static str,
        position: usize,
        expected: Role,
        found: Role,
    },
    #[snafu(display(
        "model stream failed on `{stage}` after {} bytes of text, {source}",
        partial.len()
    ))]
    ModelStream {
        stage: &'static str,
        partial: String,
        source: ProviderError,
    },
    #[snafu(display("model turn timed out after {timeout:?}"))]
    TurnTimedOut {
        stage: &'static str,
        timeout: Duration,
        partial: String,
    },
    #[snafu(display("ui sink rejected update on `{stage}`: {details}"))]
    UiSend {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("session has not started yet"))]
    SessionNotStarted { stage: &'static str },
    #[snafu(display("session already started"))]
    AlreadyStarted { stage: &'static str },
    #[snafu(display("session has ended"))]
    SessionEnded { stage: &'static str },
    #[snafu(display("a model turn is already in flight for this session"))]
    TurnInFlight { stage: &'static str },
}

impl ChatError {
    /// Error constructor for [`crate::UiSink`] implementations living outside this crate.
    pub fn ui_send(stage: &'static str, details: impl Into<String>) -> Self {
        Self::UiSend {
            stage,
            details: details.into(),
        }
    }

    /// Assistant text recovered before a model turn failed, if any was produced.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::ModelStream { partial, .. } | Self::TurnTimedOut { partial, .. } => {
                Some(partial.as_str())
            }
            _ => None,
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

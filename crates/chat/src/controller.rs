use std::sync::Arc;

use profai_llm::{LlmProvider, ProviderMessage, StreamRequest, StreamTarget};

use crate::config::ChatConfig;
use crate::error::{
    AlreadyStartedSnafu, ChatError, ChatResult, SessionEndedSnafu, SessionNotStartedSnafu,
    TurnInFlightSnafu, TurnTimedOutSnafu,
};
use crate::history::{ConversationHistory, Turn};
use crate::ids::SessionId;
use crate::relay::StreamRelay;
use crate::sink::UiSink;

/// Lifecycle of one chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Streaming,
    Terminal,
}

/// Result of one user message.
///
/// `assistant_text` is what was appended to history as the assistant turn.
/// When the model failed it holds the partial text (possibly empty) and
/// `failure` carries the cause.
#[derive(Debug)]
pub struct TurnOutcome {
    pub assistant_text: String,
    pub failure: Option<ChatError>,
}

impl TurnOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drives one session: owns its history and runs at most one model turn at a time.
pub struct SessionController {
    session_id: SessionId,
    config: Arc<ChatConfig>,
    provider: Arc<dyn LlmProvider>,
    state: SessionState,
    history: Option<ConversationHistory>,
    turns: u64,
}

impl SessionController {
    pub fn new(
        session_id: SessionId,
        config: Arc<ChatConfig>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            session_id,
            config,
            provider,
            state: SessionState::Idle,
            history: None,
            turns: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// History of a live session; `None` before `start` and after `end`.
    pub fn history(&self) -> Option<&ConversationHistory> {
        self.history.as_ref()
    }

    /// `Idle -> Active`: creates the history and greets the user.
    pub async fn start<K>(&mut self, sink: &mut K) -> ChatResult<()>
    where
        K: UiSink + ?Sized,
    {
        match self.state {
            SessionState::Idle => {}
            SessionState::Terminal => return SessionEndedSnafu { stage: "start" }.fail(),
            SessionState::Active | SessionState::Streaming => {
                return AlreadyStartedSnafu { stage: "start" }.fail();
            }
        }

        self.history = Some(ConversationHistory::create(self.config.sequence_policy));
        self.state = SessionState::Active;
        tracing::info!(session_id = %self.session_id, "chat session started");

        if let Err(error) = sink.send(&self.config.welcome_message).await {
            tracing::warn!(
                session_id = %self.session_id,
                error = %error,
                "failed to send welcome message"
            );
        }
        Ok(())
    }

    /// `Active -> Streaming -> Active`: runs one user turn to completion.
    ///
    /// Model failures do not fail this call; they come back in
    /// [`TurnOutcome::failure`] after the partial answer was recorded and a
    /// notice was shown. Errors are returned only when the session cannot take
    /// a message at all, or the user turn itself is rejected by the history.
    pub async fn handle_message<K>(
        &mut self,
        content: impl Into<String>,
        sink: &mut K,
    ) -> ChatResult<TurnOutcome>
    where
        K: UiSink + ?Sized,
    {
        match self.state {
            SessionState::Active => {}
            SessionState::Idle => {
                return SessionNotStartedSnafu {
                    stage: "handle-message",
                }
                .fail();
            }
            SessionState::Streaming => {
                return TurnInFlightSnafu {
                    stage: "handle-message",
                }
                .fail();
            }
            SessionState::Terminal => {
                return SessionEndedSnafu {
                    stage: "handle-message",
                }
                .fail();
            }
        }

        let Some(history) = self.history.as_mut() else {
            return SessionNotStartedSnafu {
                stage: "handle-message-history",
            }
            .fail();
        };
        history.append(Turn::user(content))?;
        self.turns += 1;

        let request = self.build_request();
        self.state = SessionState::Streaming;

        let mut relay = StreamRelay::new();
        let result = self.invoke(request, &mut relay, sink).await;
        relay.finish(sink).await;

        let outcome = match result {
            Ok(assistant_text) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    turn = self.turns,
                    fragments = relay.fragments(),
                    "assistant turn completed"
                );
                TurnOutcome {
                    assistant_text,
                    failure: None,
                }
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    turn = self.turns,
                    error = %error,
                    "assistant turn failed; keeping partial answer"
                );
                let notice = format!("The model could not finish its answer: {error}");
                if let Err(notice_error) = sink.send_notice(&notice).await {
                    tracing::warn!(
                        session_id = %self.session_id,
                        error = %notice_error,
                        "failed to show error notice"
                    );
                }
                TurnOutcome {
                    assistant_text: relay.into_text(),
                    failure: Some(error),
                }
            }
        };

        if let Some(history) = self.history.as_mut()
            && let Err(error) = history.append(Turn::assistant(outcome.assistant_text.clone()))
        {
            tracing::warn!(
                session_id = %self.session_id,
                error = %error,
                "assistant turn was not recorded"
            );
        }
        self.state = SessionState::Active;

        Ok(outcome)
    }

    /// `* -> Terminal`: drops the history. Further calls fail with `SessionEnded`.
    pub fn end(&mut self) {
        if self.state == SessionState::Streaming {
            tracing::info!(
                session_id = %self.session_id,
                turn = self.turns,
                "session ended while a model turn was in flight"
            );
        }
        self.state = SessionState::Terminal;
        self.history = None;
        tracing::info!(session_id = %self.session_id, turns = self.turns, "chat session ended");
    }

    /// Request for the newest user turn: the full history, unmodified, plus instructions.
    fn build_request(&self) -> StreamRequest {
        let config = &self.config;
        let messages = self
            .history
            .as_ref()
            .map(|history| {
                history
                    .snapshot()
                    .iter()
                    .map(ProviderMessage::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let target = StreamTarget::new(self.session_id.as_uuid(), self.turns);

        let mut request = StreamRequest::new(target, config.model_id.as_str(), messages)
            .with_preamble(config.instructions.as_str());
        if let Some(temperature) = config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }

    async fn invoke<K>(
        &self,
        request: StreamRequest,
        relay: &mut StreamRelay,
        sink: &mut K,
    ) -> ChatResult<String>
    where
        K: UiSink + ?Sized,
    {
        // The placeholder goes up before the provider is even asked.
        relay.open(sink).await;

        let handle = self
            .provider
            .stream_chat(request)
            .map_err(|source| ChatError::ModelStream {
                stage: "open-model-stream",
                partial: String::new(),
                source,
            })?;
        // Dropping the stream cancels the worker, so the join handle is not kept.
        tokio::spawn(handle.worker);

        let Some(timeout) = self.config.turn_timeout else {
            return relay.run(handle.stream, sink).await;
        };

        let relayed = tokio::time::timeout(timeout, relay.run(handle.stream, sink)).await;
        match relayed {
            Ok(result) => result,
            // The timed-out relay future was dropped with its stream, which stops the worker.
            Err(_) => TurnTimedOutSnafu {
                stage: "model-turn-timeout",
                timeout,
                partial: relay.accumulated().to_string(),
            }
            .fail(),
        }
    }
}

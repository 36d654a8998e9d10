use std::collections::VecDeque;
use std::sync::Mutex;

use profai_llm::{
    BoxFuture, LlmProvider, ProviderError, ProviderResult, ProviderStreamHandle, ProviderWorker,
    StreamEvent, StreamRequest, make_event_stream,
};

use crate::error::{ChatError, ChatResult};
use crate::ids::MessageId;
use crate::sink::UiSink;

pub fn text(fragment: &str) -> ProviderResult<StreamEvent> {
    Ok(StreamEvent::TextDelta(fragment.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Send(MessageId, String),
    Open(MessageId),
    Append(MessageId, String),
    Finish(MessageId),
    Notice(String),
}

/// Sink that records every successful call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    pub fail_open: bool,
    pub fail_appends: bool,
}

impl RecordingSink {
    pub fn appends(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Append(_, fragment) => Some(fragment.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Send(_, content) => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Notice(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }
}

impl UiSink for RecordingSink {
    fn send<'a>(&'a mut self, content: &'a str) -> BoxFuture<'a, ChatResult<MessageId>> {
        Box::pin(async move {
            let message_id = MessageId::new_v7();
            self.calls.push(SinkCall::Send(message_id, content.to_string()));
            Ok(message_id)
        })
    }

    fn open_message(&mut self) -> BoxFuture<'_, ChatResult<MessageId>> {
        Box::pin(async move {
            if self.fail_open {
                return Err(ChatError::ui_send("test-open", "open rejected"));
            }
            let message_id = MessageId::new_v7();
            self.calls.push(SinkCall::Open(message_id));
            Ok(message_id)
        })
    }

    fn append<'a>(
        &'a mut self,
        message_id: MessageId,
        fragment: &'a str,
    ) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            if self.fail_appends {
                return Err(ChatError::ui_send("test-append", "append rejected"));
            }
            self.calls.push(SinkCall::Append(message_id, fragment.to_string()));
            Ok(())
        })
    }

    fn finish(&mut self, message_id: MessageId) -> BoxFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            self.calls.push(SinkCall::Finish(message_id));
            Ok(())
        })
    }

    fn send_notice<'a>(&'a mut self, notice: &'a str) -> BoxFuture<'a, ChatResult<()>> {
        Box::pin(async move {
            self.calls.push(SinkCall::Notice(notice.to_string()));
            Ok(())
        })
    }
}

/// One scripted model invocation.
pub enum Script {
    /// Emits the events, then ends the stream.
    Events(Vec<ProviderResult<StreamEvent>>),
    /// Emits the events, then stays open until the consumer cancels.
    Stall(Vec<ProviderResult<StreamEvent>>),
    /// Fails before any stream exists.
    SetupFailure,
}

/// Provider that replays scripts in order and records each request.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn stream_chat(&self, request: StreamRequest) -> ProviderResult<ProviderStreamHandle> {
        let target = request.target;
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Events(Vec::new()));

        let (events, stall) = match script {
            Script::Events(events) => (events, false),
            Script::Stall(events) => (events, true),
            Script::SetupFailure => {
                return Err(ProviderError::stream_failed("scripted-setup", "model offline"));
            }
        };

        let (event_tx, stream, cancel_rx) = make_event_stream(target);
        let worker: ProviderWorker = Box::pin(async move {
            for event in events {
                if event_tx.send(event).is_err() {
                    return;
                }
            }
            if stall {
                let _ = cancel_rx.await;
            }
        });

        Ok(ProviderStreamHandle { stream, worker })
    }
}

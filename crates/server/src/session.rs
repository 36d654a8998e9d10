use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use profai_chat::{SessionController, SessionId, UiSink};
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::SessionRegistry;
use crate::server::AppState;
use crate::sink::WebSocketSink;

/// Runs one browser session from upgrade to disconnect.
pub async fn run_socket_session(socket: WebSocket, state: AppState) {
    let session_id = SessionId::new_v7();
    let (ws_writer, ws_reader) = socket.split();
    let (sink, frames) = WebSocketSink::channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = oneshot::channel();

    state.registry.register(session_id, inbound_tx).await;

    let writer = tokio::spawn(write_frames(session_id, ws_writer, frames));
    let reader = tokio::spawn(read_frames(
        session_id,
        ws_reader,
        state.registry.clone(),
        closed_tx,
    ));

    let controller = SessionController::new(
        session_id,
        state.chat_config.clone(),
        state.provider.clone(),
    );
    drive_session(controller, sink, inbound_rx, closed_rx, &state.registry).await;

    reader.abort();
    // The sink was dropped with the session, so the writer drains and closes.
    if let Err(error) = writer.await {
        tracing::debug!(session_id = %session_id, error = %error, "socket writer ended abnormally");
    }
}

/// Session event loop.
///
/// Messages routed to this session through the registry queue in `inbound`
/// and are handled one at a time, so a session never has two model turns in
/// flight. `closed` resolves when the client goes away; a turn running at that
/// moment is dropped, which cancels its model stream and leaves the partial UI
/// message as it was. The registry entry is removed on the way out.
///
/// Returns how many messages were handled to completion.
pub async fn drive_session<K>(
    mut controller: SessionController,
    mut sink: K,
    mut inbound: mpsc::UnboundedReceiver<String>,
    mut closed: oneshot::Receiver<()>,
    registry: &SessionRegistry,
) -> u64
where
    K: UiSink,
{
    let session_id = controller.session_id();

    if let Err(error) = controller.start(&mut sink).await {
        tracing::warn!(session_id = %session_id, error = %error, "session failed to start");
    }

    let mut handled = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut closed => break,
            next = inbound.recv() => {
                let Some(content) = next else {
                    break;
                };

                let turn = controller.handle_message(content, &mut sink);
                tokio::select! {
                    biased;
                    _ = &mut closed => {
                        tracing::info!(
                            session_id = %session_id,
                            "client disconnected mid-turn; cancelling model stream"
                        );
                        break;
                    }
                    result = turn => match result {
                        Ok(outcome) => {
                            handled += 1;
                            if let Some(failure) = &outcome.failure {
                                tracing::debug!(
                                    session_id = %session_id,
                                    error = %failure,
                                    "turn recovered from model failure"
                                );
                            }
                        }
                        Err(error) => {
                            tracing::warn!(
                                session_id = %session_id,
                                error = %error,
                                "message rejected"
                            );
                        }
                    }
                }
            }
        }
    }

    controller.end();
    if let Some(entry) = registry.remove(session_id).await {
        tracing::info!(
            session_id = %session_id,
            messages = entry.messages,
            connected_secs = entry.age().as_secs(),
            "session removed"
        );
    }
    handled
}

async fn write_frames(
    session_id: SessionId,
    mut writer: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<ServerMessage>,
) {
    while let Some(frame) = frames.recv().await {
        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(session_id = %session_id, error = %error, "failed to encode frame");
                continue;
            }
        };

        if let Err(error) = writer.send(Message::Text(payload.into())).await {
            tracing::debug!(session_id = %session_id, error = %error, "socket write failed");
            return;
        }
    }

    let _ = writer.close().await;
}

async fn read_frames(
    session_id: SessionId,
    mut reader: SplitStream<WebSocket>,
    registry: Arc<SessionRegistry>,
    closed: oneshot::Sender<()>,
) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::UserMessage { content }) => {
                    if content.trim().is_empty() {
                        tracing::debug!(session_id = %session_id, "ignoring blank message");
                        continue;
                    }
                    if !registry.dispatch(session_id, content).await {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %error,
                        "ignoring malformed frame"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(session_id = %session_id, error = %error, "socket read failed");
                break;
            }
        }
    }

    tracing::info!(session_id = %session_id, "client disconnected");
    let _ = closed.send(());
}

//! JSON frames exchanged with the browser widget over the WebSocket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    UserMessage { content: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Frames sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A complete message, e.g. the welcome banner.
    Message { id: Uuid, content: String },
    /// An empty assistant message that tokens will be appended to.
    MessageStart { id: Uuid },
    Token { id: Uuid, delta: String },
    MessageEnd { id: Uuid },
    Notice { level: NoticeLevel, content: String },
}

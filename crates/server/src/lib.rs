//! HTTP and WebSocket host for the ProfAI chat widget.

#![deny(unsafe_code)]

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod settings;
pub mod sink;

pub use error::{ServerError, ServerResult};
pub use protocol::{ClientMessage, NoticeLevel, ServerMessage};
pub use registry::{SessionEntry, SessionRegistry};
pub use server::{AppState, router, run, serve};
pub use session::{drive_session, run_socket_session};
pub use settings::{AppSettings, CONFIG_PATH_ENV, SettingsError, SettingsResult};
pub use sink::WebSocketSink;

use std::net::SocketAddr;

use profai_llm::ProviderError;
use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ServerError {
    #[snafu(display("invalid settings on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("model provider unavailable on `{stage}`: {source}"))]
    Provider {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("failed to bind {address}: {source}"))]
    Bind {
        stage: &'static str,
        address: SocketAddr,
        source: std::io::Error,
    },
    #[snafu(display("server stopped with an error: {source}"))]
    Serve {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type ServerResult<T> = Result<T, ServerError>;

use std::path::PathBuf;

use profai::{CONFIG_PATH_ENV, ServerError};
use tracing_subscriber::EnvFilter;

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    profai::run(config_path.as_deref()).await
}

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{Html, Response};
use axum::routing::get;
use profai_chat::ChatConfig;
use profai_llm::{LlmProvider, create_provider};
use serde::Serialize;
use snafu::ResultExt;
use tokio::net::TcpListener;

use crate::error::{BindSnafu, ProviderSnafu, ServeSnafu, ServerResult, SettingsSnafu};
use crate::registry::SessionRegistry;
use crate::session::run_socket_session;
use crate::settings::AppSettings;

const WIDGET_HTML: &str = include_str!("../static/index.html");

/// Shared by every connection. Sessions only read it.
#[derive(Clone)]
pub struct AppState {
    pub chat_config: Arc<ChatConfig>,
    pub provider: Arc<dyn LlmProvider>,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(chat_config: ChatConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            chat_config: Arc::new(chat_config),
            provider,
            registry: Arc::new(SessionRegistry::new()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    sessions: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(upgrade))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(WIDGET_HTML)
}

async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        sessions: state.registry.len().await,
    })
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_socket_session(socket, state))
}

/// Loads settings and serves until ctrl-c.
pub async fn run(config_path: Option<&Path>) -> ServerResult<()> {
    let settings = AppSettings::load(config_path).context(SettingsSnafu {
        stage: "load-settings",
    })?;
    serve(settings).await
}

pub async fn serve(settings: AppSettings) -> ServerResult<()> {
    let provider_config = settings.provider_config().context(SettingsSnafu {
        stage: "validate-settings",
    })?;
    let address = settings.bind_address().context(SettingsSnafu {
        stage: "validate-settings",
    })?;
    let provider = create_provider(provider_config).context(ProviderSnafu {
        stage: "create-provider",
    })?;

    let state = AppState::new(settings.chat_config(), provider);
    let listener = TcpListener::bind(address).await.context(BindSnafu {
        stage: "bind-listener",
        address,
    })?;

    tracing::info!(
        address = %address,
        provider_id = %state.provider.id(),
        provider = %state.provider.name(),
        model_id = %state.chat_config.model_id,
        "serving chat widget"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(ServeSnafu { stage: "serve" })
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown requested");
}

use std::sync::Arc;

mod provider;
mod rig_adapter;

pub use provider::{
    BoxFuture, DEFAULT_BASE_URL, DEFAULT_MODEL_ID, DEFAULT_PROVIDER_ID, LlmProvider,
    ProviderConfig, ProviderError, ProviderEventStream, ProviderMessage, ProviderResult,
    ProviderStreamHandle, ProviderWorker, Role, StreamEvent, StreamRequest, StreamTarget,
    make_event_stream,
};
pub use rig_adapter::{RIG_OPENAI_PROVIDER_ID, RigProviderAdapter};

/// Builds the provider named by `config.provider_id`.
///
/// Gemini is reached through its OpenAI-compatible endpoint, so it shares the
/// rig OpenAI adapter.
pub fn create_provider(mut config: ProviderConfig) -> ProviderResult<Arc<dyn LlmProvider>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        "openai" | "rig-openai" | "gemini" => {
            config.provider_id = RIG_OPENAI_PROVIDER_ID.to_string();
            Ok(Arc::new(RigProviderAdapter::new(config)?))
        }
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}

//! Provider construction from configuration.

use std::sync::Arc;

use eventwire_config::AppConfig;
use eventwire_core::error::ProviderError;
use eventwire_core::provider::{ModelProvider, SearchProvider};

use crate::openai_compat::OpenAiModelProvider;
use crate::tavily::TavilySearchProvider;

/// The collaborators a search agent needs.
#[derive(Clone)]
pub struct Providers {
    pub model: Arc<dyn ModelProvider>,
    pub search: Arc<dyn SearchProvider>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("model", &self.model.name())
            .field("search", &self.search.name())
            .finish()
    }
}

/// Build both providers from configuration.
///
/// Fails with [`ProviderError::NotConfigured`] when either API key is missing.
pub fn build_from_config(config: &AppConfig) -> Result<Providers, ProviderError> {
    let model_key = config.model.api_key.as_deref().ok_or_else(|| {
        ProviderError::NotConfigured("MODEL_API_KEY is not set".into())
    })?;
    let search_key = config.search.api_key.as_deref().ok_or_else(|| {
        ProviderError::NotConfigured("TAVILY_API_KEY is not set".into())
    })?;

    let model = OpenAiModelProvider::new(
        provider_name(&config.model.base_url),
        &config.model.base_url,
        model_key,
        &config.model.model,
    )
    .with_temperature(config.model.temperature)
    .with_max_tokens(config.model.max_tokens);

    let search = TavilySearchProvider::new(search_key)
        .with_base_url(&config.search.base_url)
        .with_max_results(config.search.max_results)
        .with_images(config.search.include_images);

    Ok(Providers {
        model: Arc::new(model),
        search: Arc::new(search),
    })
}

/// Name a model endpoint after the well-known host it points at.
fn provider_name(base_url: &str) -> &'static str {
    if base_url.contains("api.openai.com") {
        "openai"
    } else if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains("localhost:11434") {
        "ollama"
    } else {
        "custom"
    }
}

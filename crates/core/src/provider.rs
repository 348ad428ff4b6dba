//! Collaborator traits: the model and search backends the agent talks to.
//!
//! Both are opaque request/response services. Implementations live in
//! `eventwire-providers`; tests use scripted mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::ProviderError;

/// Text generation backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete reply.
    async fn query(&self, prompt: &str) -> std::result::Result<String, ProviderError>;

    /// Send a prompt and get the reply as ordered text fragments.
    ///
    /// Default implementation calls `query()` and yields the reply as a
    /// single fragment.
    async fn query_stream(
        &self,
        prompt: &str,
    ) -> std::result::Result<mpsc::Receiver<std::result::Result<String, ProviderError>>, ProviderError>
    {
        let reply = self.query(prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(reply)).await;
        Ok(rx)
    }
}

/// One search result. Fields beyond `title` and `url` are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Everything a search returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<SearchHit>,

    #[serde(default)]
    pub images: Vec<Value>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.images.is_empty()
    }
}

/// Web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> std::result::Result<SearchResults, ProviderError>;
}

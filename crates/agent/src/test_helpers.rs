//! Scripted collaborators for agent tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use eventwire_core::error::ProviderError;
use eventwire_core::provider::{ModelProvider, SearchHit, SearchProvider, SearchResults};

/// A model that answers `query` calls from a script and replays a fixed
/// list of fragments for every `query_stream` call.
///
/// Panics if `query` is called more times than replies were scripted.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    fragments: Vec<Result<String, ProviderError>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(
        replies: Vec<Result<String, ProviderError>>,
        fragments: Vec<Result<String, ProviderError>>,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fragments,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted_model"
    }

    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedModel: no more replies for prompt {prompt:?}"))
    }

    async fn query_stream(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let (tx, rx) = mpsc::channel(self.fragments.len().max(1));
        for fragment in &self.fragments {
            tx.send(fragment.clone()).await.unwrap();
        }
        Ok(rx)
    }
}

/// A search provider that returns the same outcome for every query.
pub struct ScriptedSearch {
    outcome: Result<SearchResults, ProviderError>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new(outcome: Result<SearchResults, ProviderError>) -> Self {
        Self {
            outcome,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted_search"
    }

    async fn search(&self, query: &str) -> Result<SearchResults, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.outcome.clone()
    }
}

/// Two results and one image.
pub fn sample_results() -> SearchResults {
    SearchResults {
        results: vec![
            SearchHit::new("Tokio", "https://tokio.rs").with_field("content", "An async runtime for Rust"),
            SearchHit::new("async-std", "https://async.rs").with_field("content", "Async version of std"),
        ],
        images: vec![serde_json::json!("https://tokio.rs/logo.png")],
    }
}

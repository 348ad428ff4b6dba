//! Search agent: answers a query by searching the web and summarising.
//!
//! # Flow
//!
//! 1. `PLAN`: announce the rephrasing step
//! 2. Ask the model to rephrase the query; `REPHRASE` carries the result
//! 3. `SEARCH`: announce the search
//! 4. Search; `SOURCES` and `IMAGES` documents, each only when non-empty
//! 5. `FINAL_RESPONSE`: the model's summary, streamed chunk by chunk
//! 6. Complete the response
//!
//! [`SearchAgent::run`] turns collaborator failures into an error event and
//! still completes the response, so a client always sees the done event.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use eventwire_core::error::ProviderError;
use eventwire_core::event::ErrorContent;
use eventwire_core::identity::Identity;
use eventwire_core::provider::{ModelProvider, SearchProvider};
use eventwire_core::responder::Responder;

use crate::error::AgentError;
use crate::prompts;

pub const PLAN: &str = "PLAN";
pub const REPHRASE: &str = "REPHRASE";
pub const SEARCH: &str = "SEARCH";
pub const SOURCES: &str = "SOURCES";
pub const IMAGES: &str = "IMAGES";
pub const FINAL_RESPONSE: &str = "FINAL_RESPONSE";

pub struct SearchAgent {
    identity: Identity,
    model: Arc<dyn ModelProvider>,
    search: Arc<dyn SearchProvider>,
}

impl SearchAgent {
    pub fn new(
        identity: Identity,
        model: Arc<dyn ModelProvider>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            identity,
            model,
            search,
        }
    }

    /// The identity stamped as `source` on every event.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Run the full flow for `query`, completing the response on success.
    pub async fn assist(&self, query: &str, responder: &mut Responder) -> Result<(), AgentError> {
        info!(agent = %self.identity.id, "Assisting with query");

        // ── Rephrase ──
        responder.emit_text(PLAN, "Rephrasing user query...").await?;
        let rephrased = self
            .model
            .query(&prompts::rephrase(query))
            .await
            .map_err(|e| AgentError::provider(self.model.name(), e))?;
        let rephrased = rephrased.trim();
        responder
            .emit_text(REPHRASE, format!("Rephrased query: {rephrased}"))
            .await?;

        // ── Search ──
        responder
            .emit_text(SEARCH, "Searching internet for results...")
            .await?;
        let results = self
            .search
            .search(rephrased)
            .await
            .map_err(|e| AgentError::provider(self.search.name(), e))?;
        debug!(
            results = results.results.len(),
            images = results.images.len(),
            "Search returned"
        );

        if !results.results.is_empty() {
            responder
                .emit_json(SOURCES, &json!({ "results": results.results }))
                .await?;
        }
        if !results.images.is_empty() {
            responder
                .emit_json(IMAGES, &json!({ "images": results.images }))
                .await?;
        }

        // ── Summarise ──
        let stream = responder.create_stream(FINAL_RESPONSE)?;
        let mut fragments = self
            .model
            .query_stream(&prompts::summarise(&results))
            .await
            .map_err(|e| AgentError::provider(self.model.name(), e))?;

        while let Some(fragment) = fragments.recv().await {
            let fragment = fragment.map_err(|e| AgentError::provider(self.model.name(), e))?;
            if !fragment.is_empty() {
                stream.emit_chunk(fragment).await?;
            }
        }
        stream.complete().await?;

        responder.complete().await?;
        info!(agent = %self.identity.id, "Query answered");
        Ok(())
    }

    /// Like [`assist`](Self::assist), but a failing collaborator becomes an
    /// error event followed by completion instead of an `Err`.
    ///
    /// Protocol errors (such as the consumer going away) are returned after
    /// a best-effort completion.
    pub async fn run(&self, query: &str, responder: &mut Responder) -> eventwire_core::Result<()> {
        match self.assist(query, responder).await {
            Ok(()) => Ok(()),
            Err(AgentError::Provider { provider, source }) => {
                warn!(%provider, error = %source, "Provider failed, reporting to client");
                responder.emit_error(error_content(&provider, &source)).await?;
                responder.complete().await
            }
            Err(AgentError::Protocol(e)) => {
                warn!(error = %e, "Response aborted");
                let _ = responder.complete().await;
                Err(e)
            }
        }
    }
}

fn error_content(provider: &str, error: &ProviderError) -> ErrorContent {
    ErrorContent::new(error.to_string())
        .with_code(error.status_code())
        .with_detail("provider", provider)
}

//! Prompt templates sent to the model provider.

use eventwire_core::provider::SearchResults;

/// Prompt asking the model to rewrite `query` for a web search engine.
pub fn rephrase(query: &str) -> String {
    format!("Rephrase the following query for better search results: {query}")
}

/// Prompt asking the model to summarise search results.
///
/// The results are embedded as JSON so titles, URLs and snippets all reach
/// the model.
pub fn summarise(results: &SearchResults) -> String {
    let rendered = serde_json::to_string(&results.results).unwrap_or_default();
    format!("Summarise the following search results: {rendered}")
}

//! Tavily web search provider.
//!
//! Sends `POST {base_url}/search` and maps the reply to [`SearchResults`].
//! Tavily returns images either as plain URLs or as `{url, description}`
//! objects depending on the account; both are passed through as JSON values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use eventwire_core::error::ProviderError;
use eventwire_core::provider::{SearchHit, SearchProvider, SearchResults};

use crate::{check_status, http_client};

pub struct TavilySearchProvider {
    base_url: String,
    api_key: String,
    max_results: u32,
    include_images: bool,
    client: reqwest::Client,
}

impl TavilySearchProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.tavily.com".into(),
            api_key: api_key.into(),
            max_results: 5,
            include_images: true,
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_images(mut self, include_images: bool) -> Self {
        self.include_images = include_images;
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> std::result::Result<SearchResults, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            include_images: self.include_images,
        };

        debug!(query, max_results = self.max_results, "Sending search request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let response: SearchResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse search response: {e}")))?;

        debug!(
            results = response.results.len(),
            images = response.images.len(),
            "Search complete"
        );

        Ok(SearchResults {
            results: response.results,
            images: response.images,
        })
    }
}

// --- Tavily API types (internal) ---

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
    #[serde(default)]
    images: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn builder_settings() {
        let provider = TavilySearchProvider::new("tvly-key")
            .with_base_url("http://localhost:9999/")
            .with_max_results(3)
            .with_images(false);

        assert_eq!(provider.name(), "tavily");
        assert_eq!(provider.base_url, "http://localhost:9999");
        assert_eq!(provider.max_results, 3);
        assert!(!provider.include_images);
    }

    #[test]
    fn parse_search_response() {
        let data = r#"{
            "query": "rust",
            "results": [
                {"title": "Rust", "url": "https://rust-lang.org", "content": "A language", "score": 0.98}
            ],
            "images": ["https://img/1.png", {"url": "https://img/2.png", "description": "logo"}]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(data).unwrap();

        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].url, "https://rust-lang.org");
        assert_eq!(parsed.results[0].extra["content"], "A language");
        assert_eq!(parsed.images.len(), 2);
        assert!(parsed.images[0].is_string());
        assert_eq!(parsed.images[1]["description"], "logo");
    }

    #[test]
    fn parse_response_without_images() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(parsed.images.is_empty());
    }

    #[tokio::test]
    async fn search_sends_request_body() {
        let app = Router::new().route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                // Echo the request back as a single result so the test can inspect it.
                Json(serde_json::json!({
                    "results": [{
                        "title": body["query"],
                        "url": "https://example.com",
                        "api_key": body["api_key"],
                        "max_results": body["max_results"],
                        "include_images": body["include_images"],
                    }],
                    "images": []
                }))
            }),
        );
        let url = serve(app).await;
        let provider = TavilySearchProvider::new("tvly-key")
            .with_base_url(url)
            .with_max_results(7);

        let results = provider.search("rust async").await.unwrap();
        let hit = &results.results[0];
        assert_eq!(hit.title, "rust async");
        assert_eq!(hit.extra["api_key"], "tvly-key");
        assert_eq!(hit.extra["max_results"], 7);
        assert_eq!(hit.extra["include_images"], true);
        assert!(results.images.is_empty());
    }

    #[tokio::test]
    async fn search_maps_server_error() {
        let app = Router::new().route(
            "/search",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let url = serve(app).await;
        let provider = TavilySearchProvider::new("k").with_base_url(url);

        match provider.search("x").await {
            Err(ProviderError::ApiError { status_code, message }) => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "upstream down");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }
}

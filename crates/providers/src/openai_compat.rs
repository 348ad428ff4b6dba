//! OpenAI-compatible model provider.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions`. Each prompt is sent as a single user message.
//!
//! Supports:
//! - Non-streaming completions (`query`)
//! - Streaming SSE completions (`query_stream`)

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use eventwire_core::error::ProviderError;
use eventwire_core::provider::ModelProvider;

use crate::{check_status, http_client};

/// An OpenAI-compatible model provider.
pub struct OpenAiModelProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiModelProvider {
    /// Create a new provider for `model` at `base_url`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            client: http_client(),
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body);
        if body.stream {
            request = request.header("Accept", "text/event-stream");
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        check_status(response).await
    }
}

#[async_trait]
impl ModelProvider for OpenAiModelProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self.post(&self.request_body(prompt, false)).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))
    }

    async fn query_stream(
        &self,
        prompt: &str,
    ) -> std::result::Result<mpsc::Receiver<std::result::Result<String, ProviderError>>, ProviderError>
    {
        debug!(provider = %self.name, model = %self.model, "Sending streaming request");

        let response = self.post(&self.request_body(prompt, true)).await?;
        let (tx, rx) = mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward content deltas
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend(&bytes);

                // Process complete lines
                while let Some(line) = buffer.next_line() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            let _ = tx
                                .send(Err(ProviderError::InvalidResponse(format!(
                                    "Stream line is not valid UTF-8: {e}"
                                ))))
                                .await;
                            return;
                        }
                    };

                    match parse_sse_line(&line) {
                        SseLine::Skip => {}
                        SseLine::Done => return,
                        SseLine::Content(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        SseLine::Unparseable(error) => {
                            trace!(
                                provider = %provider_name,
                                line = %line,
                                error = %error,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }
            // Stream ended without [DONE]; closing the channel ends the reply.
        });

        Ok(rx)
    }
}

/// Raw response bytes split into lines.
///
/// Network chunks may end inside a multi-byte character, so bytes are only
/// decoded once a whole line has arrived.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// The next complete line without its `\n` or `\r\n` terminator.
    fn next_line(&mut self) -> Option<Result<String, std::string::FromUtf8Error>> {
        let end = self.bytes.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8(line))
    }
}

/// What one SSE line of a streaming completion means.
#[derive(Debug, PartialEq)]
enum SseLine {
    /// Blank line, comment, non-data field or a delta without text
    Skip,
    /// `data: [DONE]`
    Done,
    /// A non-empty content delta
    Content(String),
    Unparseable(String),
}

fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map_or(SseLine::Skip, SseLine::Content),
        Err(e) => SseLine::Unparseable(e.to_string()),
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::post;

    /// Serve a fixed `/chat/completions` response on a random local port.
    async fn serve(status: StatusCode, content_type: &'static str, body: &'static str) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move || async move { (status, [(header::CONTENT_TYPE, content_type)], body).into_response() }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiModelProvider::openai("sk-test", "gpt-4o-mini");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert!(provider.base_url.contains("api.openai.com"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiModelProvider::new("local", "http://localhost:11434/v1/", "x", "llama3");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn request_body_shape() {
        let provider = OpenAiModelProvider::openai("sk", "gpt-4o")
            .with_temperature(0.2)
            .with_max_tokens(256);
        let body = serde_json::to_value(provider.request_body("hello", true)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn request_body_omits_unset_max_tokens() {
        let provider = OpenAiModelProvider::openai("sk", "gpt-4o");
        let body = serde_json::to_value(provider.request_body("hi", false)).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Content("Hello".into()));
    }

    #[test]
    fn parse_done_marker() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line("data:[DONE]"), SseLine::Done);
    }

    #[test]
    fn parse_skips_noise() {
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line("event: message"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#),
            SseLine::Skip
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            SseLine::Skip
        );
    }

    #[test]
    fn parse_unparseable() {
        assert!(matches!(parse_sse_line("data: {not json"), SseLine::Unparseable(_)));
    }

    // --- HTTP round trips against a local server ---

    #[tokio::test]
    async fn query_returns_first_choice() {
        let url = serve(
            StatusCode::OK,
            "application/json",
            r#"{"choices":[{"message":{"role":"assistant","content":"Rust programming language"}}]}"#,
        )
        .await;
        let provider = OpenAiModelProvider::new("test", url, "sk", "m");

        let reply = provider.query("rephrase: rust").await.unwrap();
        assert_eq!(reply, "Rust programming language");
    }

    #[tokio::test]
    async fn query_without_choices_is_invalid() {
        let url = serve(StatusCode::OK, "application/json", r#"{"choices":[]}"#).await;
        let provider = OpenAiModelProvider::new("test", url, "sk", "m");

        assert!(matches!(
            provider.query("x").await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn query_maps_auth_failure() {
        let url = serve(StatusCode::UNAUTHORIZED, "application/json", "{}").await;
        let provider = OpenAiModelProvider::new("test", url, "bad", "m");

        assert!(matches!(
            provider.query("x").await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn query_stream_yields_deltas_until_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        let url = serve(StatusCode::OK, "text/event-stream", body).await;
        let provider = OpenAiModelProvider::new("test", url, "sk", "m");

        let mut rx = provider.query_stream("summarise").await.unwrap();
        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn query_stream_maps_rate_limit() {
        let url = serve(StatusCode::TOO_MANY_REQUESTS, "application/json", "{}").await;
        let provider = OpenAiModelProvider::new("test", url, "sk", "m");

        assert!(matches!(
            provider.query_stream("x").await,
            Err(ProviderError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn query_stream_keeps_characters_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n\ndata: [DONE]\n\n";
        let split = line.find('é').unwrap() + 1;
        let chunks = vec![line.as_bytes()[..split].to_vec(), line.as_bytes()[split..].to_vec()];

        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let chunks = chunks.clone();
                async move {
                    let stream = futures::stream::iter(chunks).then(|chunk| async move {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<_, std::io::Error>(chunk)
                    });
                    (
                        [(header::CONTENT_TYPE, "text/event-stream")],
                        axum::body::Body::from_stream(stream),
                    )
                        .into_response()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let provider = OpenAiModelProvider::new("test", format!("http://{addr}"), "sk", "m");

        let mut rx = provider.query_stream("summarise").await.unwrap();
        let mut text = String::new();
        while let Some(fragment) = rx.recv().await {
            text.push_str(&fragment.unwrap());
        }
        assert_eq!(text, "café");
    }

    // --- Line buffering ---

    #[test]
    fn line_buffer_waits_for_whole_characters() {
        let bytes = "é\n".as_bytes();
        let mut buffer = LineBuffer::default();

        buffer.extend(&bytes[..1]);
        assert!(buffer.next_line().is_none());
        buffer.extend(&bytes[1..]);
        assert_eq!(buffer.next_line().unwrap().unwrap(), "é");
        assert!(buffer.next_line().is_none());
    }

    #[test]
    fn line_buffer_strips_crlf() {
        let mut buffer = LineBuffer::default();
        buffer.extend(b"data: a\r\n\r\ndata: b");

        assert_eq!(buffer.next_line().unwrap().unwrap(), "data: a");
        assert_eq!(buffer.next_line().unwrap().unwrap(), "");
        assert!(buffer.next_line().is_none());
    }

    #[test]
    fn line_buffer_reports_invalid_utf8() {
        let mut buffer = LineBuffer::default();
        buffer.extend(&[b'd', 0xff, b'\n']);
        assert!(buffer.next_line().unwrap().is_err());
    }
}

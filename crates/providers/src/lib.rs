//! Model and search provider implementations for Eventwire.
//!
//! Providers implement the `eventwire_core` collaborator traits.
//! [`build_from_config`] wires both from an `AppConfig`.

pub mod builder;
pub mod openai_compat;
pub mod tavily;

pub use builder::{Providers, build_from_config};
pub use openai_compat::OpenAiModelProvider;
pub use tavily::TavilySearchProvider;

use eventwire_core::error::ProviderError;
use tracing::warn;

/// Seconds to wait after a 429 when the server sends no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Shared HTTP client settings for every provider.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map non-success HTTP statuses to provider errors.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

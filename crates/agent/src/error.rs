//! Errors raised while assisting with a query.

use eventwire_core::error::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A collaborator failed; `provider` names which one.
    #[error("{provider} failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// The response protocol rejected a call or the consumer went away.
    #[error(transparent)]
    Protocol(#[from] eventwire_core::Error),
}

impl AgentError {
    pub(crate) fn provider(provider: &str, source: ProviderError) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            source,
        }
    }
}

//! The search agent: plan, rephrase, search, summarise.
//!
//! The agent drives a [`Responder`](eventwire_core::Responder) in program
//! order, so every event of a response reaches the client in the order it
//! was produced:
//!
//! 1. **Plan**: tell the client what is about to happen
//! 2. **Rephrase** the query via the model provider
//! 3. **Search** the web with the rephrased query
//! 4. **Summarise** the results as a streamed text response
//! 5. **Complete**: closing chunks and the done event
//!
//! [`spawn_response`] runs one response per tokio task with its own channel.

pub mod error;
pub mod prompts;
pub mod search_agent;
pub mod spawn;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::AgentError;
pub use search_agent::SearchAgent;
pub use spawn::spawn_response;

//! # Eventwire Core
//!
//! The response streaming protocol: identities, chained event ids, the event
//! model, stream and response handlers, the delivery channel and the traits
//! for the model and search collaborators.
//!
//! ## Layers
//!
//! - [`ResponseHandler`] and [`StreamHandler`] are synchronous. Each call
//!   finalizes zero or more [`Event`]s and hands them back to the caller.
//! - [`Responder`] and [`TextStream`] wrap them for async producers, pushing
//!   each finalized event onto a delivery [`channel`] whose consumer is the
//!   transport.
//!
//! Everything else (HTTP, provider clients, configuration) lives in the
//! other workspace crates and depends inward on this one.

pub mod channel;
pub mod error;
pub mod event;
pub mod id;
pub mod identity;
mod json;
pub mod provider;
pub mod responder;
pub mod response;
pub mod stream;

// Re-export key types at crate root for ergonomics
pub use channel::{EventReceiver, EventSender, channel};
pub use error::{Error, ProviderError, Result};
pub use event::{
    DEFAULT_ERROR_CODE, DONE_EVENT_NAME, ERROR_EVENT_NAME, ErrorContent, Event, EventDraft,
    EventPayload, STREAM_END_PLACEHOLDER,
};
pub use id::{EventId, IdHandler, is_chain};
pub use identity::Identity;
pub use provider::{ModelProvider, SearchHit, SearchProvider, SearchResults};
pub use responder::{Responder, TextStream};
pub use response::{Completion, ResponseHandler};
pub use stream::StreamHandler;

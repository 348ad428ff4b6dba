//! One response per task.
//!
//! Each query gets its own [`Responder`] and its own delivery channel, so
//! concurrent responses share no mutable state.

use std::sync::Arc;

use tracing::{Instrument, debug, info_span};

use eventwire_core::channel::{EventReceiver, channel};
use eventwire_core::responder::Responder;

use crate::search_agent::SearchAgent;

/// Run `agent` on `query` in a new tokio task and return the consumer side
/// of its delivery channel.
///
/// The receiver yields every event of the response and then `None`.
pub fn spawn_response(agent: Arc<SearchAgent>, query: impl Into<String>, capacity: usize) -> EventReceiver {
    let (tx, rx) = channel(capacity);
    let query = query.into();
    let span = info_span!("response", agent = %agent.identity().id);

    tokio::spawn(
        async move {
            let mut responder = Responder::new(agent.identity().clone(), tx);
            if let Err(e) = agent.run(&query, &mut responder).await {
                debug!(error = %e, "Response ended early");
            }
        }
        .instrument(span),
    );

    rx
}

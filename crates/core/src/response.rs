//! The response handler: the completion state machine of one response.
//!
//! A handler starts `Open` and moves to `Complete` exactly once. While open it
//! turns application calls into finalized events; once complete every
//! mutating call fails with [`Error::HandlerClosed`].
//!
//! ```text
//!   Open ──complete() / respond()──▶ Complete
//! ```
//!
//! `complete()` closes any stream the caller left open, in the order the
//! streams were created, and then finalizes the terminal done event.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::{
    DONE_EVENT_NAME, ERROR_EVENT_NAME, ErrorContent, Event, EventDraft, EventPayload,
};
use crate::id::{IdHandler, random_token};
use crate::identity::Identity;
use crate::json::to_document;
use crate::stream::{SharedIds, StreamHandler, lock};

/// Length of generated stream ids.
const STREAM_ID_LEN: usize = 10;

/// Events produced by completing a response.
#[derive(Debug, Clone)]
pub struct Completion {
    closed_streams: Vec<Event>,
    done: Event,
}

impl Completion {
    /// Terminal chunks of streams that were still open, in creation order.
    pub fn closed_streams(&self) -> &[Event] {
        &self.closed_streams
    }

    /// The done event.
    pub fn done(&self) -> &Event {
        &self.done
    }

    /// All events in finalization order, done last.
    pub fn into_events(self) -> Vec<Event> {
        let mut events = self.closed_streams;
        events.push(self.done);
        events
    }
}

/// Per-response orchestrator.
#[derive(Debug)]
pub struct ResponseHandler {
    source: Identity,
    ids: SharedIds,
    streams: Vec<StreamHandler>,
    is_complete: bool,
}

impl ResponseHandler {
    /// Create a handler with a fresh id chain.
    pub fn new(source: Identity) -> Self {
        Self {
            source,
            ids: Arc::new(Mutex::new(IdHandler::new())),
            streams: Vec::new(),
            is_complete: false,
        }
    }

    pub fn source(&self) -> &Identity {
        &self.source
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Streams created so far, in creation order.
    pub fn streams(&self) -> &[StreamHandler] {
        &self.streams
    }

    pub fn stream(&self, stream_id: &str) -> Option<&StreamHandler> {
        self.streams.iter().find(|s| s.id() == stream_id)
    }

    /// Finalize a text block event.
    pub fn emit_text(&mut self, event_name: &str, content: impl Into<String>) -> Result<Event> {
        self.ensure_open()?;
        Ok(self.finalize(event_name, EventPayload::TextBlock {
            content: content.into(),
        }))
    }

    /// Finalize a document event.
    ///
    /// `data` is converted to JSON first; if that fails, or `data` holds a
    /// NaN or infinite float, the call returns [`Error::Validation`] and no
    /// id is consumed.
    pub fn emit_json<T: Serialize + ?Sized>(&mut self, event_name: &str, data: &T) -> Result<Event> {
        self.ensure_open()?;
        let content = to_document(data)?;
        Ok(self.finalize(event_name, EventPayload::Document { content }))
    }

    /// Finalize an error event. Does not complete the response.
    pub fn emit_error(&mut self, error: ErrorContent) -> Result<Event> {
        self.ensure_open()?;
        Ok(self.finalize(ERROR_EVENT_NAME, EventPayload::Error { content: error }))
    }

    /// Open a new stream. The handler keeps a handle so it can close the
    /// stream on completion.
    pub fn create_stream(&mut self, event_name: &str) -> Result<StreamHandler> {
        self.ensure_open()?;
        let mut stream_id = random_token(STREAM_ID_LEN);
        while self.stream(&stream_id).is_some() {
            stream_id = random_token(STREAM_ID_LEN);
        }
        let stream = StreamHandler::new(
            self.source.id.clone(),
            event_name,
            stream_id,
            Arc::clone(&self.ids),
        );
        debug!(stream_id = %stream.id(), event_name, "Stream created");
        self.streams.push(stream.clone());
        Ok(stream)
    }

    /// Reply with a single atomic event and complete the response.
    ///
    /// A response that serializes to a JSON string becomes a text block;
    /// anything else becomes a document.
    pub fn respond<T: Serialize + ?Sized>(
        &mut self,
        event_name: &str,
        response: &T,
    ) -> Result<(Event, Completion)> {
        self.ensure_open()?;
        let payload = match to_document(response)? {
            Value::String(content) => EventPayload::TextBlock { content },
            content => EventPayload::Document { content },
        };
        let event = self.finalize(event_name, payload);
        let completion = self.complete().ok_or(Error::HandlerClosed)?;
        Ok((event, completion))
    }

    /// Complete the response.
    ///
    /// Returns `None` if the response was already complete. Otherwise closes
    /// every open stream, marks the handler complete and returns the closing
    /// events followed by the done event.
    pub fn complete(&mut self) -> Option<Completion> {
        if self.is_complete {
            return None;
        }

        let mut closed_streams = Vec::new();
        for stream in &self.streams {
            if let Some(event) = stream.close_if_open() {
                warn!(stream_id = %stream.id(), "Closing stream left open at completion");
                closed_streams.push(event);
            }
        }

        self.is_complete = true;
        let done = self.finalize(DONE_EVENT_NAME, EventPayload::Done);
        debug!(source = %self.source.id, closed = closed_streams.len(), "Response complete");

        Some(Completion {
            closed_streams,
            done,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_complete {
            return Err(Error::HandlerClosed);
        }
        Ok(())
    }

    fn finalize(&self, event_name: &str, payload: EventPayload) -> Event {
        let draft = EventDraft::new(self.source.id.clone(), event_name, payload);
        let event = draft.finalize(&mut lock(&self.ids));
        debug!(
            id = %event.id(),
            event_name = %event.event_name(),
            content_type = event.content_type(),
            "Event finalized"
        );
        event
    }
}

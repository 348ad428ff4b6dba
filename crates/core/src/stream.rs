//! Text streams: one long text delivered as ordered chunks under one id.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{Event, EventDraft, EventPayload, STREAM_END_PLACEHOLDER};
use crate::id::IdHandler;

/// The id chain of one response, shared by the handler and its streams.
pub(crate) type SharedIds = Arc<Mutex<IdHandler>>;

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one stream of a response.
///
/// Cloning the handle is cheap; all clones refer to the same stream. The
/// owning [`ResponseHandler`](crate::ResponseHandler) keeps one clone so it
/// can close the stream when the response completes.
#[derive(Debug, Clone)]
pub struct StreamHandler {
    inner: Arc<StreamInner>,
}

#[derive(Debug)]
struct StreamInner {
    source: String,
    event_name: String,
    stream_id: String,
    ids: SharedIds,
    is_complete: Mutex<bool>,
}

impl StreamHandler {
    pub(crate) fn new(
        source: impl Into<String>,
        event_name: impl Into<String>,
        stream_id: impl Into<String>,
        ids: SharedIds,
    ) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                source: source.into(),
                event_name: event_name.into(),
                stream_id: stream_id.into(),
                ids,
                is_complete: Mutex::new(false),
            }),
        }
    }

    /// The stream id shared by every chunk of this stream.
    pub fn id(&self) -> &str {
        &self.inner.stream_id
    }

    pub fn event_name(&self) -> &str {
        &self.inner.event_name
    }

    pub fn is_complete(&self) -> bool {
        *lock(&self.inner.is_complete)
    }

    /// Finalize the next chunk of the stream.
    pub fn emit(&self, chunk: impl Into<String>) -> Result<Event> {
        let is_complete = lock(&self.inner.is_complete);
        if *is_complete {
            return Err(self.closed());
        }
        Ok(self.finalize(chunk.into(), false))
    }

    /// Finalize the terminal chunk and close the stream.
    ///
    /// Fails with [`Error::StreamClosed`] if the stream was already closed;
    /// nothing is emitted in that case.
    pub fn complete(&self) -> Result<Event> {
        self.close_if_open().ok_or_else(|| self.closed())
    }

    /// Close the stream unless it already is. The flag check and the id
    /// assignment happen under one lock.
    pub(crate) fn close_if_open(&self) -> Option<Event> {
        let mut is_complete = lock(&self.inner.is_complete);
        if *is_complete {
            return None;
        }
        *is_complete = true;
        Some(self.finalize(STREAM_END_PLACEHOLDER.to_string(), true))
    }

    fn finalize(&self, content: String, is_complete: bool) -> Event {
        let draft = EventDraft::new(
            self.inner.source.clone(),
            self.inner.event_name.clone(),
            EventPayload::TextChunk {
                stream_id: self.inner.stream_id.clone(),
                content,
                is_complete,
            },
        );
        let event = draft.finalize(&mut lock(&self.inner.ids));
        debug!(
            id = %event.id(),
            stream_id = %self.inner.stream_id,
            is_complete,
            "Stream chunk finalized"
        );
        event
    }

    fn closed(&self) -> Error {
        Error::StreamClosed {
            stream_id: self.inner.stream_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> StreamHandler {
        StreamHandler::new("agent", "FINAL_RESPONSE", "s1", Arc::new(Mutex::new(IdHandler::new())))
    }

    #[test]
    fn emit_produces_open_chunks() {
        let stream = stream();
        let event = stream.emit("hello").unwrap();

        match event.payload() {
            EventPayload::TextChunk {
                stream_id,
                content,
                is_complete,
            } => {
                assert_eq!(stream_id, "s1");
                assert_eq!(content, "hello");
                assert!(!is_complete);
            }
            other => panic!("Expected TextChunk, got {other:?}"),
        }
        assert_eq!(event.event_name(), "FINAL_RESPONSE");
        assert_eq!(event.source(), "agent");
        assert!(!stream.is_complete());
    }

    #[test]
    fn complete_emits_placeholder_terminal_chunk() {
        let stream = stream();
        let event = stream.complete().unwrap();

        assert_eq!(event.text(), Some(" "));
        assert!(matches!(
            event.payload(),
            EventPayload::TextChunk { is_complete: true, .. }
        ));
        assert!(stream.is_complete());
    }

    #[test]
    fn emit_after_complete_fails() {
        let stream = stream();
        stream.complete().unwrap();

        let err = stream.emit("late").unwrap_err();
        assert!(matches!(err, Error::StreamClosed { ref stream_id } if stream_id == "s1"));
    }

    #[test]
    fn double_complete_fails_without_emitting() {
        let ids = Arc::new(Mutex::new(IdHandler::new()));
        let stream = StreamHandler::new("agent", "X", "s1", ids.clone());
        let last = stream.complete().unwrap();

        assert!(stream.complete().is_err());
        assert_eq!(lock(&ids).last(), Some(last.id()));
    }

    #[test]
    fn clones_share_state() {
        let stream = stream();
        let handle = stream.clone();
        handle.complete().unwrap();
        assert!(stream.is_complete());
        assert!(stream.close_if_open().is_none());
    }

    #[test]
    fn chunks_chain_ids() {
        let stream = stream();
        let a = stream.emit("a").unwrap();
        let b = stream.emit("b").unwrap();
        let end = stream.complete().unwrap();
        assert!(b.id().follows(a.id()));
        assert!(end.id().follows(b.id()));
    }
}

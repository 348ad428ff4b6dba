//! The wire event model.
//!
//! Every event carries an `id`, the `source` identity id and an
//! `event_name`, plus a payload discriminated by `content_type`:
//!
//! | `content_type`       | Payload                                   |
//! |----------------------|-------------------------------------------|
//! | `atomic.textblock`   | `content`: complete text message          |
//! | `atomic.json`        | `content`: structured JSON document       |
//! | `chunked.text`       | `stream_id`, `content`, `is_complete`     |
//! | `atomic.error`       | `content`: [`ErrorContent`]               |
//! | `atomic.done`        | none; no further events follow            |
//!
//! Events are only built through [`EventDraft::finalize`], which is the point
//! where the id is issued. After that an [`Event`] exposes read-only
//! accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{EventId, IdHandler};

/// Error code used when the caller does not supply one.
pub const DEFAULT_ERROR_CODE: i32 = 500;

/// Content of the terminal chunk of a stream. Never empty on the wire.
pub const STREAM_END_PLACEHOLDER: &str = " ";

/// `event_name` of every error event.
pub const ERROR_EVENT_NAME: &str = "error";

/// `event_name` of the terminal done event.
pub const DONE_EVENT_NAME: &str = "done";

/// Body of an error event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub error_message: String,

    #[serde(default = "default_error_code")]
    pub error_code: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

fn default_error_code() -> i32 {
    DEFAULT_ERROR_CODE
}

impl ErrorContent {
    /// An error with [`DEFAULT_ERROR_CODE`] and no details.
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_code: DEFAULT_ERROR_CODE,
            details: None,
        }
    }

    pub fn with_code(mut self, error_code: i32) -> Self {
        self.error_code = error_code;
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Add a single detail entry, creating the map if needed.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Variant-specific part of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type")]
pub enum EventPayload {
    /// One atomic, complete text message.
    #[serde(rename = "atomic.textblock")]
    TextBlock { content: String },

    /// One atomic structured payload.
    #[serde(rename = "atomic.json")]
    Document { content: Value },

    /// One fragment of an ordered text stream.
    #[serde(rename = "chunked.text")]
    TextChunk {
        stream_id: String,
        content: String,
        is_complete: bool,
    },

    /// An error surfaced to the client.
    #[serde(rename = "atomic.error")]
    Error { content: ErrorContent },

    /// Terminal marker for the response.
    #[serde(rename = "atomic.done")]
    Done,
}

impl EventPayload {
    /// The `content_type` discriminator written on the wire.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::TextBlock { .. } => "atomic.textblock",
            Self::Document { .. } => "atomic.json",
            Self::TextChunk { .. } => "chunked.text",
            Self::Error { .. } => "atomic.error",
            Self::Done => "atomic.done",
        }
    }
}

/// An event that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct EventDraft {
    source: String,
    event_name: String,
    payload: EventPayload,
}

impl EventDraft {
    pub fn new(source: impl Into<String>, event_name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            source: source.into(),
            event_name: event_name.into(),
            payload,
        }
    }

    /// Assign the next id of the chain, freezing the event.
    pub fn finalize(self, ids: &mut IdHandler) -> Event {
        Event {
            id: ids.next(),
            source: self.source,
            event_name: self.event_name,
            payload: self.payload,
        }
    }
}

/// A finalized, immutable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    source: String,
    event_name: String,
    #[serde(flatten)]
    payload: EventPayload,
}

impl Event {
    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn content_type(&self) -> &'static str {
        self.payload.content_type()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.payload, EventPayload::Done)
    }

    /// Text of a text block or chunk event.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::TextBlock { content } | EventPayload::TextChunk { content, .. } => {
                Some(content)
            }
            _ => None,
        }
    }

    /// Stream id of a chunk event.
    pub fn stream_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::TextChunk { stream_id, .. } => Some(stream_id),
            _ => None,
        }
    }

    /// Serialize to the wire JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One server-sent-events frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", self.to_json()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize(payload: EventPayload) -> Event {
        EventDraft::new("agent", "NAME", payload).finalize(&mut IdHandler::new())
    }

    #[test]
    fn text_block_wire_format() {
        let event = finalize(EventPayload::TextBlock {
            content: "hello".into(),
        });
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["content_type"], "atomic.textblock");
        assert_eq!(json["source"], "agent");
        assert_eq!(json["event_name"], "NAME");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["id"], event.id().to_string());
    }

    #[test]
    fn chunk_wire_format() {
        let event = finalize(EventPayload::TextChunk {
            stream_id: "s1".into(),
            content: "part".into(),
            is_complete: false,
        });
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["content_type"], "chunked.text");
        assert_eq!(json["stream_id"], "s1");
        assert_eq!(json["is_complete"], false);
        assert_eq!(event.stream_id(), Some("s1"));
        assert_eq!(event.text(), Some("part"));
    }

    #[test]
    fn error_content_defaults() {
        let error = ErrorContent::new("boom");
        assert_eq!(error.error_code, DEFAULT_ERROR_CODE);
        assert!(error.details.is_none());

        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("details"));

        let parsed: ErrorContent = serde_json::from_str(r#"{"error_message":"x"}"#).unwrap();
        assert_eq!(parsed.error_code, 500);
    }

    #[test]
    fn error_content_builder() {
        let error = ErrorContent::new("rate limited")
            .with_code(429)
            .with_detail("provider", "search")
            .with_detail("retry_after", 5);

        let details = error.details.unwrap();
        assert_eq!(error.error_code, 429);
        assert_eq!(details["provider"], "search");
        assert_eq!(details["retry_after"], 5);
    }

    #[test]
    fn done_event_has_no_content() {
        let event = EventDraft::new("agent", DONE_EVENT_NAME, EventPayload::Done)
            .finalize(&mut IdHandler::new());
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert!(event.is_done());
        assert_eq!(json["content_type"], "atomic.done");
        assert_eq!(json["event_name"], "done");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn sse_frame() {
        let event = finalize(EventPayload::Document {
            content: serde_json::json!({"results": []}),
        });
        let frame = event.to_sse_frame().unwrap();

        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("}\n\n"));
        assert_eq!(frame.matches('\n').count(), 2);
    }

    #[test]
    fn frame_and_json_agree() -> serde_json::Result<()> {
        let event = finalize(EventPayload::TextBlock {
            content: "café ☕".into(),
        });
        let frame = event.to_sse_frame()?;

        assert_eq!(frame, format!("data: {}\n\n", event.to_json()?));
        let parsed: Event = serde_json::from_str(frame.trim_start_matches("data: ").trim_end())?;
        assert_eq!(parsed, event);
        Ok(())
    }

    #[test]
    fn deserialize_from_wire() {
        let event = finalize(EventPayload::Error {
            content: ErrorContent::new("bad").with_code(400),
        });
        let parsed: Event = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.content_type(), "atomic.error");
    }

    #[test]
    fn finalize_consumes_one_id() {
        let mut ids = IdHandler::new();
        let first = EventDraft::new("a", "X", EventPayload::Done).finalize(&mut ids);
        let second = EventDraft::new("a", "X", EventPayload::Done).finalize(&mut ids);
        assert!(second.id().follows(first.id()));
    }
}

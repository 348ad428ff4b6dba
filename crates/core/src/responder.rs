//! Responder: a response handler wired to a delivery channel.
//!
//! Each call finalizes its event(s) through the wrapped [`ResponseHandler`]
//! and pushes them onto the channel in the same order. Completing the
//! response pushes the closing chunks and the done event, then shuts the
//! channel down so the consumer's loop ends.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::channel::EventSender;
use crate::error::Result;
use crate::event::{ErrorContent, Event};
use crate::identity::Identity;
use crate::response::{Completion, ResponseHandler};
use crate::stream::StreamHandler;

/// Producer-side interface for one response.
///
/// Events reach the consumer in the order they were finalized, also when
/// [`TextStream`] clones are driven from other tasks: finalizing and sending
/// happen under one lock shared by the responder and its streams.
#[derive(Debug)]
pub struct Responder {
    handler: ResponseHandler,
    sender: EventSender,
    order: Arc<Mutex<()>>,
}

impl Responder {
    pub fn new(source: Identity, sender: EventSender) -> Self {
        Self {
            handler: ResponseHandler::new(source),
            sender,
            order: Arc::new(Mutex::new(())),
        }
    }

    pub fn handler(&self) -> &ResponseHandler {
        &self.handler
    }

    pub fn source(&self) -> &Identity {
        self.handler.source()
    }

    pub fn is_complete(&self) -> bool {
        self.handler.is_complete()
    }

    pub async fn emit_text(&mut self, event_name: &str, content: impl Into<String>) -> Result<()> {
        let _order = self.order.lock().await;
        let event = self.handler.emit_text(event_name, content)?;
        self.sender.send(event).await
    }

    pub async fn emit_json<T: Serialize + ?Sized>(&mut self, event_name: &str, data: &T) -> Result<()> {
        let _order = self.order.lock().await;
        let event = self.handler.emit_json(event_name, data)?;
        self.sender.send(event).await
    }

    pub async fn emit_error(&mut self, error: ErrorContent) -> Result<()> {
        let _order = self.order.lock().await;
        let event = self.handler.emit_error(error)?;
        self.sender.send(event).await
    }

    /// Open a stream whose chunks go to this responder's channel.
    pub fn create_stream(&mut self, event_name: &str) -> Result<TextStream> {
        let handle = self.handler.create_stream(event_name)?;
        Ok(TextStream {
            handle,
            sender: self.sender.clone(),
            order: Arc::clone(&self.order),
        })
    }

    /// Send a single reply and complete the response.
    pub async fn respond<T: Serialize + ?Sized>(&mut self, event_name: &str, response: &T) -> Result<()> {
        let _order = self.order.lock().await;
        let (event, completion) = self.handler.respond(event_name, response)?;
        let sent = self.sender.send(event).await;
        let finished = self.finish(completion).await;
        sent.and(finished)
    }

    /// Complete the response. A second call does nothing.
    pub async fn complete(&mut self) -> Result<()> {
        let _order = self.order.lock().await;
        match self.handler.complete() {
            Some(completion) => self.finish(completion).await,
            None => Ok(()),
        }
    }

    /// Push the completion events and shut the channel down, even if the
    /// consumer has already gone away. Callers hold the order lock.
    async fn finish(&self, completion: Completion) -> Result<()> {
        let mut result = Ok(());
        for event in completion.into_events() {
            if result.is_ok() {
                result = self.sender.send(event).await;
            }
        }
        self.sender.shutdown();
        result
    }
}

/// A stream handle that delivers each chunk as soon as it is finalized.
///
/// Clones may be moved to other tasks; delivery order still matches id order.
#[derive(Debug, Clone)]
pub struct TextStream {
    handle: StreamHandler,
    sender: EventSender,
    order: Arc<Mutex<()>>,
}

impl TextStream {
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    pub fn is_complete(&self) -> bool {
        self.handle.is_complete()
    }

    pub async fn emit_chunk(&self, chunk: impl Into<String>) -> Result<()> {
        let _order = self.order.lock().await;
        let event = self.handle.emit(chunk)?;
        self.sender.send(event).await
    }

    /// Send the terminal chunk. Fails if the stream is already closed.
    pub async fn complete(&self) -> Result<()> {
        let _order = self.order.lock().await;
        let event: Event = self.handle.complete()?;
        self.sender.send(event).await
    }
}

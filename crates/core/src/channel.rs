//! Delivery channel: the ordered boundary between the task producing a
//! response and the transport that writes it to the client.
//!
//! One channel per response. Events come out in exactly the order they went
//! in. The producer signals shutdown after the done event; the consumer then
//! drains whatever is still buffered and sees `None`, which is the normal end
//! of a response rather than an error.

use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::event::Event;

/// Create a bounded delivery channel.
///
/// `send` waits when `capacity` events are buffered, which gives a slow
/// consumer natural backpressure. A capacity of zero is raised to one.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    (
        EventSender {
            tx,
            shutdown: Arc::new(shutdown_tx),
        },
        EventReceiver {
            rx,
            shutdown: shutdown_rx,
        },
    )
}

/// Producer side. Clones share the same shutdown signal.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl EventSender {
    /// Push one finalized event.
    ///
    /// Fails with [`Error::ChannelClosed`] after shutdown or once the
    /// receiver is gone.
    pub async fn send(&self, event: Event) -> Result<()> {
        if self.is_shutdown() {
            return Err(Error::ChannelClosed);
        }
        self.tx.send(event).await.map_err(|_| Error::ChannelClosed)
    }

    /// Signal that no further events will be sent.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
    shutdown: watch::Receiver<bool>,
}

impl EventReceiver {
    /// Wait for the next event.
    ///
    /// Returns `None` once the channel has been shut down and drained, or
    /// when every sender has been dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if *self.shutdown.borrow() {
                return self.rx.try_recv().ok();
            }

            tokio::select! {
                biased;
                event = self.rx.recv() => return event,
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        // Every sender is gone without a shutdown signal.
                        return self.rx.recv().await;
                    }
                }
            }
        }
    }

    /// Adapt into a `Stream` that ends when [`recv`](Self::recv) returns `None`.
    pub fn into_stream(self) -> impl Stream<Item = Event> + Send + 'static {
        futures::stream::unfold(self, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
    }

    /// Collect every remaining event until the end of the response.
    pub async fn collect(mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

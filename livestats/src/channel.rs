//! Transport contract for push subscriptions.
//!
//! A [`Channel`] opens one subscription per call and pushes everything it
//! receives into the [`EventSink`] it was given. Transports never touch
//! controller state; they only enqueue events tagged with the subscription's
//! [`ConnectionHandle`].

use tokio::sync::mpsc;

use crate::types::Sample;

/// Opaque token for one subscription. Generations only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The server acknowledged the subscription.
    Opened,
    Sample(Sample),
    /// Terminal failure; nothing else is delivered for this handle.
    Error(String),
}

pub(crate) type Envelope = (ConnectionHandle, ChannelEvent);

/// Where a transport delivers events for a single subscription.
#[derive(Debug, Clone)]
pub struct EventSink {
    handle: ConnectionHandle,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSink {
    pub(crate) fn new(handle: ConnectionHandle, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { handle, tx }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    // Each of these returns false once the receiving side is gone; transports
    // should stop reading at that point.
    pub fn opened(&self) -> bool {
        self.send(ChannelEvent::Opened)
    }

    pub fn sample(&self, sample: Sample) -> bool {
        self.send(ChannelEvent::Sample(sample))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(ChannelEvent::Error(message.into()))
    }

    fn send(&self, event: ChannelEvent) -> bool {
        self.tx.send((self.handle, event)).is_ok()
    }
}

/// A live subscription owned by the connection manager.
pub trait Subscription: Send {
    /// Release transport resources. Must be safe to call more than once.
    fn close(&mut self);
}

pub trait Channel: Send {
    type Subscription: Subscription;

    /// Start streaming samples for `resource` into `sink`.
    fn subscribe(&mut self, resource: &str, sink: EventSink) -> Self::Subscription;
}

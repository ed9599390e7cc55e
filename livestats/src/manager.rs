//! Owns the push-subscription lifecycle for the watched resource.
//!
//! At most one subscription is open at a time. Every event a transport
//! produces goes through [`StreamConnectionManager::next_event`] /
//! [`StreamConnectionManager::try_next_event`], which only let through events
//! of the open handle: nothing is delivered after `close`, nothing after an
//! error, and `Opened` at most once.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::channel::{Channel, ChannelEvent, ConnectionHandle, Envelope, EventSink, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("subscription {} is still open; close it first", .0.generation())]
    AlreadyOpen(ConnectionHandle),
}

/// An event that passed the handle filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub handle: ConnectionHandle,
    pub event: ChannelEvent,
}

struct Active<S> {
    handle: ConnectionHandle,
    subscription: S,
    opened: bool,
    terminal: bool,
}

pub struct StreamConnectionManager<C: Channel> {
    channel: C,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    generation: u64,
    active: Option<Active<C::Subscription>>,
}

impl<C: Channel> StreamConnectionManager<C> {
    pub fn new(channel: C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            channel,
            tx,
            rx,
            generation: 0,
            active: None,
        }
    }

    pub fn open(&mut self, resource: &str) -> Result<ConnectionHandle, ManagerError> {
        if let Some(active) = &self.active {
            return Err(ManagerError::AlreadyOpen(active.handle));
        }
        self.generation += 1;
        let handle = ConnectionHandle::new(self.generation);
        let sink = EventSink::new(handle, self.tx.clone());
        let subscription = self.channel.subscribe(resource, sink);
        debug!(generation = handle.generation(), resource, "subscription opened");
        self.active = Some(Active {
            handle,
            subscription,
            opened: false,
            terminal: false,
        });
        Ok(handle)
    }

    /// Close `handle` if it is the open one. Stale or repeated closes are no-ops.
    ///
    /// Returns whether a subscription was actually released.
    pub fn close(&mut self, handle: ConnectionHandle) -> bool {
        if !self.active.as_ref().is_some_and(|a| a.handle == handle) {
            trace!(generation = handle.generation(), "close on inactive handle ignored");
            return false;
        }
        let Some(mut active) = self.active.take() else {
            return false;
        };
        active.subscription.close();
        // Everything queued so far belongs to closed handles now.
        while self.rx.try_recv().is_ok() {}
        debug!(generation = handle.generation(), "subscription closed");
        true
    }

    pub fn active_handle(&self) -> Option<ConnectionHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Next deliverable event without waiting.
    pub fn try_next_event(&mut self) -> Option<Delivery> {
        while let Ok(envelope) = self.rx.try_recv() {
            if let Some(delivery) = self.accept(envelope) {
                return Some(delivery);
            }
        }
        None
    }

    /// Wait for the next deliverable event. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<Delivery> {
        loop {
            let envelope = self.rx.recv().await?;
            if let Some(delivery) = self.accept(envelope) {
                return Some(delivery);
            }
        }
    }

    fn accept(&mut self, (handle, event): Envelope) -> Option<Delivery> {
        let active = self.active.as_mut()?;
        if active.handle != handle || active.terminal {
            trace!(generation = handle.generation(), "dropping event from inactive subscription");
            return None;
        }
        match &event {
            ChannelEvent::Opened if active.opened => return None,
            ChannelEvent::Opened => active.opened = true,
            ChannelEvent::Error(_) => active.terminal = true,
            ChannelEvent::Sample(_) => {}
        }
        Some(Delivery { handle, event })
    }
}

impl<C: Channel> Drop for StreamConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.subscription.close();
        }
    }
}

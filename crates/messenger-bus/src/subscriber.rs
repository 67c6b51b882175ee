//! # Event Subscribers
//!
//! The publish/subscribe side of the bus.
//!
//! Three flavours of subscription share one delivery path:
//!
//! - plain listeners, called with every payload;
//! - selector listeners, called only when a projection of the payload
//!   changes;
//! - streams, which forward payloads into an unbounded channel so that slow
//!   consumers never hold up the publisher.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use messenger_types::Payload;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

use crate::bus::BusInner;

/// Identifier of one live subscription, unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Listener called with every payload of an event.
pub type Listener = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Projection applied to a payload before change detection.
pub type Selector = Arc<dyn Fn(&Payload) -> Payload + Send + Sync>;

/// Listener called with `(selected, previous)` when the selection changes.
pub type SelectorListener = Arc<dyn Fn(&Payload, Option<&Payload>) + Send + Sync>;

/// Errors from stream subscriptions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription was removed or the bus was dropped.
    #[error("Event subscription closed")]
    Closed,
}

pub(crate) enum Delivery {
    Plain(Listener),
    Selected {
        selector: Selector,
        listener: SelectorListener,
        previous: Mutex<Option<Payload>>,
    },
}

/// One entry in an event's ordered subscriber list.
pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    delivery: Delivery,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriptionId, delivery: Delivery) -> Self {
        Self { id, delivery }
    }

    /// Deliver a payload. Returns whether the listener was invoked.
    pub(crate) fn deliver(&self, payload: &Payload) -> bool {
        match &self.delivery {
            Delivery::Plain(listener) => {
                listener(payload);
                true
            }
            Delivery::Selected {
                selector,
                listener,
                previous,
            } => {
                let selected = selector(payload);
                let prior = {
                    let mut previous = previous.lock();
                    if previous.as_ref() == Some(&selected) {
                        return false;
                    }
                    previous.replace(selected.clone())
                };
                // lock released: the listener may publish re-entrantly
                listener(&selected, prior.as_ref());
                true
            }
        }
    }
}

/// Subscription that yields payloads asynchronously.
///
/// Dropping the stream removes the subscription from the bus.
pub struct EventStream {
    event: String,
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<Payload>,
    bus: Weak<BusInner>,
    /// Subscription list of the handle that opened this stream, if any.
    owner: Option<Weak<Mutex<Vec<SubscriptionId>>>>,
}

impl EventStream {
    pub(crate) fn channel() -> (mpsc::UnboundedSender<Payload>, mpsc::UnboundedReceiver<Payload>) {
        mpsc::unbounded_channel()
    }

    pub(crate) fn new(
        event: String,
        id: SubscriptionId,
        receiver: mpsc::UnboundedReceiver<Payload>,
        bus: Weak<BusInner>,
    ) -> Self {
        Self {
            event,
            id,
            receiver,
            bus,
            owner: None,
        }
    }

    pub(crate) fn owned_by(mut self, owner: Weak<Mutex<Vec<SubscriptionId>>>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Receive the next payload.
    ///
    /// Returns `None` once the subscription is gone and the buffer drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.receiver.recv().await
    }

    /// Receive without waiting.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::Closed` once the subscription is gone and the
    /// buffer drained.
    pub fn try_recv(&mut self) -> Result<Option<Payload>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Stream for EventStream {
    type Item = Payload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.lock().retain(|id| *id != self.id);
        }
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        // Already gone if the owning handle or the bus cleared it first.
        let _ = bus.unsubscribe(self.id);
        debug!(event = %self.event, subscription = %self.id, "Event stream dropped");
    }
}

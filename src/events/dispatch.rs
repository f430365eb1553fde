use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::{EventKind, SessionEvent};

pub type Observer = Arc<dyn Fn(&SessionEvent) -> anyhow::Result<()> + Send + Sync>;

/// Stable handle returned on subscription, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Sink {
    Callback(Observer),
    Stream(mpsc::UnboundedSender<SessionEvent>),
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    sink: Sink,
}

/// Fans session events out to every subscriber of the event's kind
///
/// Delivery follows subscription order. A failing or panicking observer is
/// logged and skipped; the others still receive the event.
pub struct ListenerDispatch {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ListenerDispatch {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Add an observer for one event kind; existing observers are kept
    pub fn subscribe(&self, kind: EventKind, observer: Observer) -> SubscriptionId {
        self.insert(kind, Sink::Callback(observer))
    }

    /// Single-slot registration: drop every observer of `kind`, then add this one.
    /// Mirrors hosts that hold exactly one callback per event class.
    pub fn replace(&self, kind: EventKind, observer: Observer) -> SubscriptionId {
        let id = self.next_id();
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.retain(|s| s.kind != kind);
            subscribers.push(Subscriber {
                id,
                kind,
                sink: Sink::Callback(observer),
            });
        }
        debug!("Replaced {} listeners with {:?}", kind, id);
        id
    }

    /// Receive events of one kind as a stream; dropping the stream unsubscribes
    pub fn stream(&self, kind: EventKind) -> (SubscriptionId, UnboundedReceiverStream<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.insert(kind, Sink::Stream(tx));
        (id, UnboundedReceiverStream::new(rx))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.subscribers.write() {
            Ok(mut subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|s| s.id != id);
                before != subscribers.len()
            }
            Err(_) => false,
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .map(|subscribers| subscribers.iter().filter(|s| s.kind == kind).count())
            .unwrap_or(0)
    }

    /// Deliver an event, returning how many subscribers accepted it
    pub fn emit(&self, event: &SessionEvent) -> usize {
        let kind = event.kind();
        // Snapshot so observers may subscribe or unsubscribe while running.
        let targets: Vec<Subscriber> = match self.subscribers.read() {
            Ok(subscribers) => subscribers.iter().filter(|s| s.kind == kind).cloned().collect(),
            Err(_) => return 0,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for subscriber in targets {
            match &subscriber.sink {
                Sink::Callback(observer) => {
                    match catch_unwind(AssertUnwindSafe(|| observer(event))) {
                        Ok(Ok(())) => delivered += 1,
                        Ok(Err(e)) => warn!(
                            "Listener {:?} failed on {} event: {}",
                            subscriber.id, kind, e
                        ),
                        Err(_) => warn!("Listener {:?} panicked on {} event", subscriber.id, kind),
                    }
                }
                Sink::Stream(sender) => {
                    if sender.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(subscriber.id);
                    }
                }
            }
        }

        for id in closed {
            debug!("Pruning closed event stream {:?}", id);
            self.unsubscribe(id);
        }

        delivered
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, kind: EventKind, sink: Sink) -> SubscriptionId {
        let id = self.next_id();
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push(Subscriber { id, kind, sink });
        }
        debug!("Registered {} listener {:?}", kind, id);
        id
    }
}

impl Default for ListenerDispatch {
    fn default() -> Self {
        Self::new()
    }
}

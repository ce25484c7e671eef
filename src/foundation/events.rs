use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one registration on a [`Notifier`].
///
/// Ids are unique across every notifier in the process, so a stale id can be
/// passed to any notifier's `unsubscribe` without touching someone else's listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Receiving end of a subscription created by [`Notifier::subscribe`].
#[derive(Debug)]
pub struct Subscription<E> {
    /// Id to pass back to `unsubscribe`.
    pub id: ListenerId,
    /// Queue of events emitted after the subscription was made.
    pub rx: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    /// Drain every queued event without blocking.
    pub fn drain(&self) -> Vec<E> {
        self.rx.try_iter().collect()
    }
}

/// Listener list that fans events out over channels.
///
/// Emitters never hold references to their observers; observers own the
/// receiving side and poll it. Listeners whose receiver was dropped are pruned
/// on the next emit.
#[derive(Debug)]
pub struct Notifier<E> {
    listeners: Vec<(ListenerId, mpsc::Sender<E>)>,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E: Clone> Notifier<E> {
    /// Create an empty listener list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh channel and return its receiving end.
    pub fn subscribe(&mut self) -> Subscription<E> {
        let (tx, rx) = mpsc::channel();
        let id = self.attach(tx);
        Subscription { id, rx }
    }

    /// Register an existing sender, letting one observer multiplex several emitters.
    pub fn attach(&mut self, tx: mpsc::Sender<E>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.push((id, tx));
        id
    }

    /// Remove a registration. Returns `false` when `id` is not registered here.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every live listener.
    pub fn emit(&mut self, event: &E) {
        self.listeners
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Number of registered listeners, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Return `true` when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/events.rs"]
mod tests;

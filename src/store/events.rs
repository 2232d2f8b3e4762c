//! Synchronous multicast events with drop-scoped subscriptions.

use std::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    Weak,
};

use crate::types::Translation;

/// Payload shared by all store events.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEvent {
    pub lang: String,
    pub translations: Arc<Translation>,
}

/// Registered listener callback.
type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Listener list shared between an emitter and its subscriptions.
struct Listeners<E> {
    /// Next subscription id
    next_id: AtomicU64,
    /// Listeners in subscription order
    entries: Mutex<Vec<(u64, Listener<E>)>>,
}

/// Publishes events to every current listener, in subscription order, on the
/// emitting thread.
pub struct EventEmitter<E> {
    /// Shared listener list
    listeners: Arc<Listeners<E>>,
}

impl<E: 'static> EventEmitter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Listeners {
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Registers a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let listeners: Weak<Listeners<E>> = Arc::downgrade(&self.listeners);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners
                        .entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Calls every listener with `event`.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe while being called.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<E: 'static> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter").field("listeners", &"<Vec<Listener>>").finish()
    }
}

/// Handle of a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    /// Removes the listener; `None` once done or detached
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keeps the listener registered for the lifetime of the emitter.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.unsubscribe.is_some()).finish()
    }
}

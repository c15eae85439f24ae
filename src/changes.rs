//! Namespace-scoped change notifications.
//!
//! Listeners never run inside `notify`. Each subscriber owns a channel and
//! `notify` only pushes an immutable [`ChangeEvent`] into it, so delivery
//! never blocks and never triggers a recomputation. Subscribers drain
//! their channel when they next need to know whether anything changed.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::error::Error;

/// Caller-defined grouping key for change notifications, e.g. `wiki-pages`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace key.
    pub fn new(name: &str) -> Self {
        return Self(name.to_owned());
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Something in a namespace was renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Name that changed, or `None` when the name is unknown.
    pub name: Option<String>,
    /// Namespace the change happened in.
    pub namespace: Namespace,
}

impl ChangeEvent {
    /// True when a memo computed for `memoized` may no longer hold.
    pub fn affects(&self, memoized: &str) -> bool {
        return self.name.as_deref().is_none_or(|name| return name == memoized);
    }
}

/// Identity of one listener on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// A process-unique identifier.
    pub fn next() -> Self {
        /// Next identifier to hand out.
        static NEXT: AtomicU64 = AtomicU64::new(1);
        return Self(NEXT.fetch_add(1, Ordering::Relaxed));
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        return self.0;
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "#{}", self.0);
    }
}

/// Per-subscriber senders within one namespace.
type Listeners = HashMap<SubscriberId, Sender<ChangeEvent>>;
/// Every namespace with its listeners.
type Registry = HashMap<Namespace, Listeners>;

/// Publish/subscribe hub shared by everything that renames or resolves.
/// Cloning yields another handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct ChangeStream {
    /// Listeners by namespace, shared by every handle.
    registry: Arc<Mutex<Registry>>,
}

impl ChangeStream {
    /// An empty hub.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Register `subscriber` on `namespace`. Dropping the returned
    /// [`Subscription`] unregisters it, after which the same id may subscribe again.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadySubscribed` if `subscriber` is already
    /// registered on `namespace`; listeners are never stacked.
    pub fn subscribe(&self, namespace: &Namespace, subscriber: SubscriberId) -> Result<Subscription, Error> {
        let mut registry = self.registry.lock();
        let listeners = registry.entry(namespace.clone()).or_default();
        if listeners.contains_key(&subscriber) {
            return Err(Error::AlreadySubscribed {
                namespace: namespace.to_string(),
                subscriber: subscriber.get(),
            });
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        listeners.insert(subscriber, tx);
        tracing::debug!(%namespace, %subscriber, "subscribed");
        return Ok(Subscription {
            events: rx,
            namespace: namespace.clone(),
            registry: Arc::downgrade(&self.registry),
            subscriber,
        });
    }

    /// Remove `subscriber` from `namespace`. Returns false if it was not registered.
    pub fn unsubscribe(&self, namespace: &Namespace, subscriber: SubscriberId) -> bool {
        return remove_listener(&self.registry, namespace, subscriber);
    }

    /// Tell every listener on `namespace` that `name` changed (`None`: unknown name).
    /// Returns the number of listeners reached.
    pub fn notify(&self, namespace: &Namespace, name: Option<&str>) -> usize {
        let event = ChangeEvent {
            name: name.map(str::to_owned),
            namespace: namespace.clone(),
        };
        let mut registry = self.registry.lock();
        let Some(listeners) = registry.get_mut(namespace) else {
            return 0;
        };
        listeners.retain(|_, tx| return tx.send(event.clone()).is_ok());
        tracing::debug!(%namespace, ?name, delivered = listeners.len(), "change published");
        return listeners.len();
    }

    /// Number of listeners currently registered on `namespace`.
    pub fn listener_count(&self, namespace: &Namespace) -> usize {
        return self.registry.lock().get(namespace).map_or(0, HashMap::len);
    }
}

/// A live registration. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    /// Queue the stream delivers events into.
    events: Receiver<ChangeEvent>,
    /// Namespace listened on.
    namespace: Namespace,
    /// Registry to leave on drop. Weak so a dropped hub is not kept alive.
    registry: Weak<Mutex<Registry>>,
    /// Identity registered under.
    subscriber: SubscriberId,
}

impl Subscription {
    /// Events delivered since the last drain.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        return self.events.try_iter().collect();
    }

    /// Namespace this subscription listens on.
    pub const fn namespace(&self) -> &Namespace {
        return &self.namespace;
    }

    /// Identity of the listener.
    pub const fn subscriber(&self) -> SubscriberId {
        return self.subscriber;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove_listener(&registry, &self.namespace, self.subscriber);
            tracing::debug!(namespace = %self.namespace, subscriber = %self.subscriber, "unsubscribed");
        }
    }
}

/// Drop `subscriber` from `namespace`, pruning empty namespaces.
fn remove_listener(registry: &Mutex<Registry>, namespace: &Namespace, subscriber: SubscriberId) -> bool {
    let mut registry = registry.lock();
    let Some(listeners) = registry.get_mut(namespace) else {
        return false;
    };
    let removed = listeners.remove(&subscriber).is_some();
    if listeners.is_empty() {
        registry.remove(namespace);
    }
    return removed;
}

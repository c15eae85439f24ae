//! Memoized multi-valued resolution of one named reference.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::changes::{ChangeStream, Namespace, SubscriberId, Subscription};
use crate::error::Error;

/// Observable lifecycle state of a [`ReferenceCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Subscribed, memo valid for the last observed name.
    Fresh,
    /// Subscribed, memo cleared by a change notification.
    Stale,
    /// Nothing resolved yet, or torn down.
    Uncomputed,
}

/// The `{memo, name, subscription}` triple. Only touched under the cache lock.
struct CacheState<T> {
    /// Name the memo was computed for.
    name: Option<String>,
    /// Memoized results; valid only while `name` matches the observed name.
    results: Option<Arc<[T]>>,
    /// Live registration on the change stream.
    subscription: Option<Subscription>,
}

impl<T> CacheState<T> {
    /// Clear the memo if any delivered event could affect it.
    fn apply_pending_changes(&mut self) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        let events = subscription.drain();
        let Some(name) = self.name.as_deref() else {
            return;
        };
        if self.results.is_some() && events.iter().any(|event| return event.affects(name)) {
            tracing::debug!(name, "memo invalidated by change notification");
            self.results = None;
        }
    }
}

/// Memo for one reference, invalidated by rename notifications on its namespace.
///
/// `resolve` is a single critical section: concurrent callers serialize
/// behind whichever one recomputes and then observe its results. Change
/// notifications are queued by the stream and applied here under the same
/// lock, so delivering one never recomputes anything.
pub struct ReferenceCache<T> {
    /// Listener identity on the change stream.
    id: SubscriberId,
    /// Namespace whose renames can affect this reference.
    namespace: Namespace,
    /// Memo, name key and subscription.
    state: Mutex<CacheState<T>>,
    /// Hub the subscription is registered on.
    stream: ChangeStream,
}

impl<T> ReferenceCache<T> {
    /// An uncomputed cache listening on `namespace` once first resolved.
    pub fn new(stream: ChangeStream, namespace: Namespace) -> Self {
        return Self {
            id: SubscriberId::next(),
            namespace,
            state: Mutex::new(CacheState {
                name: None,
                results: None,
                subscription: None,
            }),
            stream,
        };
    }

    /// Resolution results for `name`, computing them with `compute` only
    /// when the memo is missing, stale, or was computed for another name.
    ///
    /// `compute` runs while the cache is locked; it must not resolve this
    /// same cache again.
    pub fn resolve<F>(&self, name: &str, compute: F) -> Arc<[T]>
    where
        F: FnOnce(&str) -> Vec<T>,
    {
        self.ensure_subscribed();
        let mut state = self.state.lock();
        state.apply_pending_changes();
        if let Some(results) = &state.results
            && state.name.as_deref() == Some(name)
        {
            tracing::debug!(name, "memo hit");
            return Arc::clone(results);
        }
        tracing::debug!(name, previous = ?state.name, "recomputing");
        let results: Arc<[T]> = Arc::from(compute(name));
        state.name = Some(name.to_owned());
        state.results = Some(Arc::clone(&results));
        return results;
    }

    /// Register on the change stream if not yet registered.
    /// The stream is never called while the cache lock is held.
    fn ensure_subscribed(&self) {
        if self.state.lock().subscription.is_some() {
            return;
        }
        match self.stream.subscribe(&self.namespace, self.id) {
            Ok(subscription) => {
                let mut state = self.state.lock();
                if state.subscription.is_none() {
                    state.subscription = Some(subscription);
                }
            },
            // Another caller registered this cache first.
            Err(Error::AlreadySubscribed { .. }) => {},
            Err(error) => tracing::warn!(%error, "cannot subscribe reference cache"),
        }
    }

    /// Drop the memo, keeping the subscription.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.results = None;
    }

    /// Current lifecycle state, after applying any queued notifications.
    pub fn status(&self) -> CacheStatus {
        let mut state = self.state.lock();
        state.apply_pending_changes();
        return match (&state.subscription, &state.results) {
            (None, _) => CacheStatus::Uncomputed,
            (Some(_), Some(_)) => CacheStatus::Fresh,
            (Some(_), None) => CacheStatus::Stale,
        };
    }

    /// Unsubscribe and forget the memo. Also happens on drop.
    pub fn teardown(&self) {
        let subscription = {
            let mut state = self.state.lock();
            state.results = None;
            state.name = None;
            state.subscription.take()
        };
        drop(subscription);
    }

    /// True while registered on the change stream.
    pub fn is_subscribed(&self) -> bool {
        return self.state.lock().subscription.is_some();
    }

    /// Name the current memo was computed for.
    pub fn memoized_name(&self) -> Option<String> {
        return self.state.lock().name.clone();
    }

    /// Listener identity used on the change stream.
    pub const fn subscriber(&self) -> SubscriberId {
        return self.id;
    }

    /// Namespace this cache listens on.
    pub const fn namespace(&self) -> &Namespace {
        return &self.namespace;
    }
}

impl<T> std::fmt::Debug for ReferenceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("ReferenceCache")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive();
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ids::SubscriptionId;

/// Raw reading from the platform. `Unknown` is what a platform reports before
/// it has determined reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivitySignal {
    Online,
    Offline,
    Unknown,
}

impl ConnectivitySignal {
    pub const fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

type Listener = Box<dyn FnMut(bool) + Send + 'static>;

struct Inner {
    online: bool,
    next_id: u64,
    listeners: BTreeMap<SubscriptionId, Listener>,
}

/// Process-wide connectivity flag with per-screen subscriptions.
///
/// Listeners run while the monitor's lock is held, so they must not call back
/// into the monitor. Once [`ConnectivityMonitor::unsubscribe`] returns, the
/// removed listener is never invoked again.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Mutex<Inner>>,
}

#[must_use = "dropping a subscription without unsubscribing leaks its listener"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
}

impl Subscription {
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConnectivityMonitor")
            .field("online", &inner.online)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl ConnectivityMonitor {
    /// A monitor with no platform signal yet reads as online.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                online: true,
                next_id: 0,
                listeners: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId::new(inner.next_id);
        let mut listener: Listener = Box::new(on_change);
        listener(inner.online);
        inner.listeners.insert(id, listener);
        tracing::debug!(subscription = %id, online = inner.online, "connectivity subscribed");
        Subscription { id }
    }

    /// Returns `false` when the subscription was already released.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let removed = self.lock().listeners.remove(&subscription.id).is_some();
        if removed {
            tracing::debug!(subscription = %subscription.id, "connectivity unsubscribed");
        }
        removed
    }

    pub fn report(&self, signal: ConnectivitySignal) {
        let online = signal.is_online();
        let mut inner = self.lock();
        if inner.online == online {
            return;
        }
        inner.online = online;
        tracing::info!(online, ?signal, "connectivity changed");
        for listener in inner.listeners.values_mut() {
            listener(online);
        }
    }
}

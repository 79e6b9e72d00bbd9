//! Same-process notification bus
//!
//! Publishes a [`ChangeNotification`] to every handler subscribed to its
//! field, synchronously and in subscription order. Nothing is persisted and
//! nothing crosses process boundaries; other clients learn about changes by
//! polling.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use crate::models::{ContentKey, ContentValue};

/// A field changed locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub field: ContentKey,
    pub payload: ContentValue,
    /// The store's `lastUpdated` that carried this value, when known
    pub last_updated: Option<i64>,
}

impl ChangeNotification {
    pub fn new(field: ContentKey, payload: impl Into<ContentValue>) -> Self {
        Self {
            field,
            payload: payload.into(),
            last_updated: None,
        }
    }

    /// Stamp the notification with the store timestamp of its value
    pub fn at(mut self, last_updated: i64) -> Self {
        self.last_updated = Some(last_updated);
        self
    }
}

/// Subscriber callback
///
/// An `Err` or a panic is logged and does not stop delivery to the
/// remaining handlers.
pub type Handler = Arc<dyn Fn(&ChangeNotification) -> anyhow::Result<()> + Send + Sync>;

/// Delivery counts for one `publish`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Entry {
    id: u64,
    /// `None` receives every field
    topic: Option<ContentKey>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Injectable publish/subscribe bus
///
/// Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct NotificationBus {
    registry: Arc<Mutex<Registry>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panicking handler never runs under this lock, so poisoning only
        // means another thread died mid-push; the Vec is still consistent.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to one field
    pub fn subscribe<F>(&self, topic: ContentKey, handler: F) -> Subscription
    where
        F: Fn(&ChangeNotification) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(Some(topic), Arc::new(handler))
    }

    /// Subscribe to every field
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChangeNotification) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, topic: Option<ContentKey>, handler: Handler) -> Subscription {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push(Entry { id, topic, handler });

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `notification` to every matching handler
    ///
    /// Handlers run on the caller's thread after the registry lock is
    /// released, so a handler may itself subscribe, unsubscribe or publish.
    pub fn publish(&self, notification: ChangeNotification) -> PublishReport {
        let handlers: Vec<Handler> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.topic.map_or(true, |t| t == notification.field))
            .map(|e| Arc::clone(&e.handler))
            .collect();

        let mut report = PublishReport::default();
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&notification))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("Handler for '{}' failed: {:#}", notification.field, e);
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("Handler for '{}' panicked", notification.field);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Published '{}' to {} handler(s), {} failed",
            notification.field,
            report.delivered + report.failed,
            report.failed
        );
        report
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Registration handle; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the handler. Safe to call more than once.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry.entries.retain(|e| e.id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

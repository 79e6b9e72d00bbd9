//! Sync client implementation
//!
//! Fetch, write-through, poll and fan-out on top of a [`ContentApi`] and the
//! local [`SnapshotCache`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::bus::{ChangeNotification, NotificationBus, PublishReport, Subscription};
use super::retry::RetryPolicy;
use super::state::SyncState;
use super::transport::ContentApi;
use crate::cache::{SnapshotCache, StoreOutcome};
use crate::documents::{builtin_default_value, ContentDocument};
use crate::error::{SyncError, SyncResult};
use crate::models::{ContentKey, ContentSnapshot, ContentValue, UploadResponse};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Fetched from the content API
    Server,
    /// Read from the local snapshot cache
    Cache,
    /// Built-in default
    Default,
    /// Delivered by a same-process notification
    Notification,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Server => "server",
            Source::Cache => "cache",
            Source::Default => "default",
            Source::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// A typed document plus the tier it was resolved from
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<D> {
    pub doc: D,
    pub source: Source,
}

/// A raw value plus the tier it was resolved from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: ContentValue,
    pub source: Source,
}

/// Successful network write
#[derive(Debug)]
pub struct WriteAck {
    /// The store's `lastUpdated` after the write
    pub last_updated: i64,
    /// Set when the local cache could not keep the value
    pub local_error: Option<SyncError>,
}

struct ClientInner<A> {
    api: A,
    cache: Arc<SnapshotCache>,
    bus: NotificationBus,
    /// Last value published per field with the `lastUpdated` it carried
    ///
    /// A poll never re-announces a value this client already published, and
    /// never applies a value older than one it published.
    published: Mutex<BTreeMap<ContentKey, (ContentValue, i64)>>,
}

type Published = BTreeMap<ContentKey, (ContentValue, i64)>;

/// True when `key` was already published from a store newer than `last_updated`
fn superseded(published: &Published, key: ContentKey, last_updated: i64) -> bool {
    published
        .get(&key)
        .is_some_and(|(_, seen)| *seen > last_updated)
}

/// Sync client shared by every editor and viewer of one process
pub struct SyncClient<A> {
    inner: Arc<ClientInner<A>>,
}

impl<A> Clone for SyncClient<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ContentApi> SyncClient<A> {
    /// Create a client with its own notification bus
    pub fn new(api: A, cache: Arc<SnapshotCache>) -> Self {
        Self::with_bus(api, cache, NotificationBus::new())
    }

    pub fn with_bus(api: A, cache: Arc<SnapshotCache>, bus: NotificationBus) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                api,
                cache,
                bus,
                published: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.inner.cache
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    fn published(&self) -> MutexGuard<'_, Published> {
        self.inner
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ==================== Reads ====================

    /// One read of the whole store, no retry
    pub async fn fetch_all(&self) -> SyncResult<ContentSnapshot> {
        self.inner.api.fetch_all().await
    }

    /// `fetch_all` with capped exponential backoff
    pub async fn fetch_all_with_retry(&self, policy: &RetryPolicy) -> SyncResult<ContentSnapshot> {
        policy.run(|| self.fetch_all()).await
    }

    /// Resolve a document: server, then local cache, then built-in default
    ///
    /// A server value is written through to the cache. A value that fails to
    /// parse is skipped like a missing one.
    pub async fn load<D: ContentDocument>(&self) -> Loaded<D> {
        match self.fetch_all().await {
            Ok(snapshot) => {
                if let Some(value) = snapshot.get(D::KEY) {
                    match D::from_value(value) {
                        Ok(doc) => {
                            if !self.keep_fetched(D::KEY, value, snapshot.last_updated()) {
                                return self.load_local();
                            }
                            return Loaded {
                                doc,
                                source: Source::Server,
                            };
                        }
                        Err(e) => warn!("Ignoring malformed server value for '{}': {}", D::KEY, e),
                    }
                }
            }
            Err(e) => warn!("Fetch for '{}' failed, using local fallback: {}", D::KEY, e),
        }
        self.load_local()
    }

    /// Resolve a document without the network: local cache, then default
    pub fn load_local<D: ContentDocument>(&self) -> Loaded<D> {
        if let Some(value) = self.inner.cache.read_content(D::KEY) {
            match D::from_value(&value) {
                Ok(doc) => {
                    return Loaded {
                        doc,
                        source: Source::Cache,
                    }
                }
                Err(e) => warn!("Ignoring malformed cached value for '{}': {}", D::KEY, e),
            }
        }
        Loaded {
            doc: D::builtin_default(),
            source: Source::Default,
        }
    }

    /// Raw-value version of [`load`](Self::load)
    pub async fn resolve(&self, key: ContentKey) -> SyncResult<Resolved> {
        match self.fetch_all().await {
            Ok(snapshot) => {
                if let Some(value) = snapshot.get(key) {
                    if self.keep_fetched(key, value, snapshot.last_updated()) {
                        return Ok(Resolved {
                            value: value.clone(),
                            source: Source::Server,
                        });
                    }
                }
            }
            Err(e) => warn!("Fetch for '{}' failed, using local fallback: {}", key, e),
        }

        if let Some(value) = self.inner.cache.read_content(key) {
            return Ok(Resolved {
                value,
                source: Source::Cache,
            });
        }
        let value = builtin_default_value(key).map_err(|e| SyncError::parse(key.as_str(), e))?;
        Ok(Resolved {
            value,
            source: Source::Default,
        })
    }

    // ==================== Writes ====================

    /// Put `value` in the local cache only
    pub fn cache_value(&self, key: ContentKey, value: &ContentValue) -> SyncResult<StoreOutcome> {
        match self.inner.cache.store_content(key, value) {
            StoreOutcome::Degraded(source) => Err(SyncError::StorageQuota { key, source }),
            outcome => Ok(outcome),
        }
    }

    fn keep_local(&self, key: ContentKey, value: &ContentValue) -> Option<SyncError> {
        match self.cache_value(key, value) {
            Ok(_) => None,
            Err(e) => {
                warn!("Continuing without a local copy of '{}': {}", key, e);
                Some(e)
            }
        }
    }

    /// Cache a fetched value unless this client already published a newer one
    ///
    /// Returns false when the value was stale and left out of the cache.
    fn keep_fetched(&self, key: ContentKey, value: &ContentValue, last_updated: i64) -> bool {
        let published = self.published();
        if superseded(&published, key, last_updated) {
            debug!(
                "Ignoring '{}' from snapshot {}: a newer value was published",
                key, last_updated
            );
            return false;
        }
        self.keep_local(key, value);
        true
    }

    /// Write one field
    ///
    /// The local cache is updated first and unconditionally. The network
    /// write is attempted once; its failure is returned to the caller, and
    /// the value stays in the cache. On success a [`ChangeNotification`]
    /// stamped with the new `lastUpdated` is published before this returns.
    pub async fn write(&self, key: ContentKey, value: ContentValue) -> SyncResult<WriteAck> {
        let local_error = self.keep_local(key, &value);

        match self.inner.api.write(key, &value).await {
            Ok(last_updated) => {
                info!("Wrote '{}' (lastUpdated={})", key, last_updated);
                {
                    let mut published = self.published();
                    if !superseded(&published, key, last_updated) {
                        published.insert(key, (value.clone(), last_updated));
                        // A poll that read the store before this write may
                        // have cached its older value in the meantime
                        if self.inner.cache.read_content(key).as_ref() != Some(&value) {
                            self.keep_local(key, &value);
                        }
                    }
                }
                self.inner
                    .bus
                    .publish(ChangeNotification::new(key, value).at(last_updated));
                Ok(WriteAck {
                    last_updated,
                    local_error,
                })
            }
            Err(e) => {
                warn!("Write of '{}' not synced, kept locally: {}", key, e);
                Err(e)
            }
        }
    }

    /// Upload a file through the content API
    pub async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<UploadResponse> {
        let reply = self.inner.api.upload(file_name, mime_type, bytes).await?;
        info!("Uploaded '{}' as {:?}", file_name, reply.file_url);
        Ok(reply)
    }

    // ==================== Notifications ====================

    /// Publish on this client's bus
    pub fn notify(&self, field: ContentKey, payload: ContentValue) -> PublishReport {
        self.inner.bus.publish(ChangeNotification::new(field, payload))
    }

    /// Subscribe on this client's bus
    pub fn subscribe<F>(&self, topic: ContentKey, handler: F) -> Subscription
    where
        F: Fn(&ChangeNotification) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(topic, handler)
    }

    /// Write every field of `snapshot` this client has not published yet
    /// through to the cache and publish it
    ///
    /// A field this client published from a newer store state is left alone,
    /// in the cache and on the bus. Returns the fields that were announced.
    pub fn absorb(&self, snapshot: &ContentSnapshot) -> Vec<ContentKey> {
        let last_updated = snapshot.last_updated();
        let mut changed = Vec::new();
        {
            let mut published = self.published();
            for (key, value) in snapshot.iter() {
                match published.get(&key) {
                    Some((_, seen)) if *seen > last_updated => {
                        debug!(
                            "Skipping '{}' from snapshot {}: already at {}",
                            key, last_updated, seen
                        );
                        continue;
                    }
                    Some((current, _)) if current == value => continue,
                    _ => {}
                }
                published.insert(key, (value.clone(), last_updated));
                self.keep_local(key, value);
                changed.push((key, value.clone()));
            }
        }

        for (key, value) in &changed {
            self.inner
                .bus
                .publish(ChangeNotification::new(*key, value.clone()).at(last_updated));
        }
        changed.into_iter().map(|(key, _)| key).collect()
    }

    // ==================== Polling ====================

    /// Poll the store every `interval`
    ///
    /// The first fetch happens immediately. `on_change` runs only for
    /// snapshots strictly newer than any seen before, and never after the
    /// returned handle is cancelled or dropped. Failed ticks are logged and
    /// retried on the next interval.
    pub fn poll<F>(&self, interval: Duration, on_change: F) -> PollHandle
    where
        F: FnMut(ContentSnapshot) + Send + 'static,
    {
        self.poll_from(SyncState::new(), interval, on_change)
    }

    /// [`poll`](Self::poll) starting from an existing timestamp gate
    pub fn poll_from<F>(&self, state: SyncState, interval: Duration, on_change: F) -> PollHandle
    where
        F: FnMut(ContentSnapshot) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            self.clone(),
            state,
            interval,
            cancel_rx,
            on_change,
        ));

        PollHandle {
            cancel: cancel_tx,
            task: Some(task),
        }
    }

    /// One shared poll loop for the whole process
    ///
    /// Every accepted snapshot is written through to the cache and each field
    /// that changed is published on the bus, so viewers only subscribe.
    pub fn start_sync(&self, interval: Duration) -> PollHandle {
        let client = self.clone();
        self.poll(interval, move |snapshot| {
            let changed = client.absorb(&snapshot);
            debug!(
                "Snapshot {} changed {} field(s)",
                snapshot.last_updated(),
                changed.len()
            );
        })
    }
}

/// How often the poll loop checks the cache for writes by other processes
fn hint_period(interval: Duration) -> Duration {
    (interval / 4).clamp(Duration::from_millis(50), Duration::from_secs(1))
}

fn is_cancelled(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // Err means the handle was dropped, which cancels too
    let _ = rx.wait_for(|cancelled| *cancelled).await;
}

async fn poll_loop<A, F>(
    client: SyncClient<A>,
    mut state: SyncState,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
    mut on_change: F,
) where
    A: ContentApi,
    F: FnMut(ContentSnapshot) + Send + 'static,
{
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut hint = tokio::time::interval(hint_period(interval));
    hint.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("Poll loop started ({:?})", interval);
    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            _ = ticker.tick() => {}
            _ = hint.tick() => {
                if !client.inner.cache.changed_externally() {
                    continue;
                }
                debug!("Cache written by another process, fetching early");
                ticker.reset();
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            result = client.fetch_all() => result,
        };

        if is_cancelled(&cancel) {
            debug!("Dropping poll result that arrived after cancellation");
            break;
        }

        match result {
            Ok(snapshot) => {
                if state.observe(snapshot.last_updated()) {
                    on_change(snapshot);
                }
            }
            Err(e) => warn!("Poll tick failed, retrying next interval: {}", e),
        }
    }
    debug!("Poll loop stopped");
}

/// Cancellation handle for a poll loop
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop future ticks. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Cancel and wait for the loop to exit
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Poll loop ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! Editors and viewers
//!
//! A [`ContentEditor`] does whole-document read-modify-write through the
//! sync client. A [`Viewer`] is one mounted consumer of a document: it
//! resolves an initial value, then follows same-process notifications and,
//! optionally, its own poll loop.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::documents::ContentDocument;
use crate::error::SyncError;
use crate::models::{ContentKey, ContentValue};
use crate::sync::{ContentApi, PollHandle, Subscription, SyncClient};

pub use crate::sync::{Loaded, Source};

/// Result of an editor save, phrased for the person editing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored on the server
    Synced { last_updated: i64 },
    /// Kept in the local cache; the server did not get it
    SavedLocally { reason: String },
    /// The server refused the content
    Rejected { message: String },
}

impl SaveOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SaveOutcome::Synced { .. })
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Synced { .. } => write!(f, "Saved"),
            SaveOutcome::SavedLocally { reason } => {
                write!(f, "Saved locally, not synced: {}", reason)
            }
            SaveOutcome::Rejected { message } => write!(f, "Rejected: {}", message),
        }
    }
}

impl From<Result<i64, SyncError>> for SaveOutcome {
    fn from(result: Result<i64, SyncError>) -> Self {
        match result {
            Ok(last_updated) => SaveOutcome::Synced { last_updated },
            Err(SyncError::Validation { message, .. }) => SaveOutcome::Rejected { message },
            Err(SyncError::Status { status, message }) if (400..500).contains(&status) => {
                SaveOutcome::Rejected { message }
            }
            Err(e) => SaveOutcome::SavedLocally {
                reason: e.to_string(),
            },
        }
    }
}

/// Whole-document editor
pub struct ContentEditor<A> {
    client: SyncClient<A>,
}

impl<A: ContentApi> ContentEditor<A> {
    pub fn new(client: SyncClient<A>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SyncClient<A> {
        &self.client
    }

    /// Current value by the server → cache → default chain
    pub async fn current<D: ContentDocument>(&self) -> Loaded<D> {
        self.client.load::<D>().await
    }

    /// Replace the whole document
    pub async fn save<D: ContentDocument>(&self, doc: &D) -> SaveOutcome {
        match doc.to_value() {
            Ok(value) => self.save_value(D::KEY, value).await,
            Err(e) => SaveOutcome::Rejected {
                message: format!("could not serialize {}: {}", D::KEY, e),
            },
        }
    }

    /// Replace one field with an already-serialized value
    pub async fn save_value(&self, key: ContentKey, value: ContentValue) -> SaveOutcome {
        let outcome: SaveOutcome = self
            .client
            .write(key, value)
            .await
            .map(|ack| ack.last_updated)
            .into();
        debug!("Save of '{}': {}", key, outcome);
        outcome
    }

    /// Read-modify-write
    ///
    /// Concurrent editors are not detected; whichever save reaches the server
    /// last wins.
    pub async fn update<D, F>(&self, edit: F) -> SaveOutcome
    where
        D: ContentDocument,
        F: FnOnce(&mut D),
    {
        let mut doc = self.current::<D>().await.doc;
        edit(&mut doc);
        self.save(&doc).await
    }
}

/// A mounted consumer of one document
///
/// Dropping the viewer unmounts it.
pub struct Viewer<D: ContentDocument> {
    feed: Arc<Feed<D>>,
    rx: watch::Receiver<Loaded<D>>,
    subscription: Option<Subscription>,
    poll: Option<PollHandle>,
}

/// The viewed value plus the newest store timestamp applied to it
struct Feed<D> {
    tx: watch::Sender<Loaded<D>>,
    applied: AtomicI64,
}

impl<D: ContentDocument> Feed<D> {
    fn new(initial: Loaded<D>) -> (Self, watch::Receiver<Loaded<D>>) {
        let (tx, rx) = watch::channel(initial);
        let feed = Self {
            tx,
            applied: AtomicI64::new(i64::MIN),
        };
        (feed, rx)
    }

    /// Replace the viewed value if the document actually changed
    ///
    /// A value stamped older than one already applied is dropped. The check
    /// runs under the channel lock, so a notification and a poll result
    /// racing each other cannot reorder.
    fn offer(&self, doc: D, source: Source, last_updated: Option<i64>) -> bool {
        self.tx.send_if_modified(|current| {
            if let Some(ts) = last_updated {
                let applied = self.applied.load(Ordering::Acquire);
                if ts < applied {
                    debug!(
                        "Dropping '{}' from {} at {}: already showing {}",
                        D::KEY, source, ts, applied
                    );
                    return false;
                }
                self.applied.store(ts, Ordering::Release);
            }
            if current.doc == doc {
                return false;
            }
            *current = Loaded { doc, source };
            true
        })
    }
}

impl<D: ContentDocument> Viewer<D> {
    /// Resolve the initial value and subscribe to notifications for `D`
    pub async fn mount<A: ContentApi>(client: &SyncClient<A>) -> Self {
        let initial = client.load::<D>().await;
        debug!("Mounted viewer for '{}' from {}", D::KEY, initial.source);

        let (feed, rx) = Feed::new(initial);
        let feed = Arc::new(feed);

        let sink = Arc::clone(&feed);
        let subscription = client.subscribe(D::KEY, move |notification| {
            let doc = D::from_value(&notification.payload)
                .with_context(|| format!("malformed '{}' notification", D::KEY))?;
            sink.offer(doc, Source::Notification, notification.last_updated);
            Ok(())
        });

        Self {
            feed,
            rx,
            subscription: Some(subscription),
            poll: None,
        }
    }

    /// Also run a poll loop owned by this viewer
    ///
    /// A poll result older than a value this viewer already shows is ignored.
    pub fn with_polling<A: ContentApi>(mut self, client: &SyncClient<A>, interval: Duration) -> Self {
        let sink = Arc::clone(&self.feed);
        self.poll = Some(client.poll(interval, move |snapshot| {
            let Some(value) = snapshot.get(D::KEY) else {
                return;
            };
            match D::from_value(value) {
                Ok(doc) => {
                    sink.offer(doc, Source::Server, Some(snapshot.last_updated()));
                }
                Err(e) => warn!("Ignoring malformed '{}' from poll: {}", D::KEY, e),
            }
        }));
        self
    }

    /// Latest value and its source
    pub fn current(&self) -> Loaded<D> {
        self.rx.borrow().clone()
    }

    pub fn doc(&self) -> D {
        self.rx.borrow().doc.clone()
    }

    pub fn source(&self) -> Source {
        self.rx.borrow().source
    }

    /// Another receiver for the same value
    pub fn watch(&self) -> watch::Receiver<Loaded<D>> {
        self.rx.clone()
    }

    /// Wait for the next change
    pub async fn changed(&mut self) -> Loaded<D> {
        // The sender lives in `self`, so this only returns on a real change
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some() || self.poll.is_some()
    }

    /// Stop receiving updates. Safe to call more than once.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
    }
}

impl<D: ContentDocument> Drop for Viewer<D> {
    fn drop(&mut self) {
        self.unmount();
    }
}

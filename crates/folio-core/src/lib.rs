//! folio Core Library
//!
//! This crate provides the content synchronization machinery behind the
//! folio portfolio site: a shared server-side content store, a per-client
//! local snapshot cache, and a polling sync client with a same-process
//! notification bus.
//!
//! # Architecture
//!
//! - **ContentStore**: authoritative, process-lifetime key/value store held
//!   by the server. Whole-field writes, last write wins.
//! - **SnapshotCache**: durable per-client cache (SQLite) used as a
//!   first-paint/offline fallback and as a write-through target.
//! - **SyncClient**: fetch, write-through, poll and fan-out on top of the two.
//!
//! # Quick Start
//!
//! ```text
//! let cache = Arc::new(SnapshotCache::open(&config)?);
//! let client = SyncClient::new(HttpContentApi::new(&config.server_url)?, cache);
//!
//! let editor = ContentEditor::new(client.clone());
//! editor.update::<HeaderLines, _>(|lines| lines.set(0, "I am a calm,")).await;
//!
//! let handle = client.start_sync(Duration::from_millis(config.poll_interval_ms));
//! ```
//!
//! # Modules
//!
//! - `models`: content keys, values, snapshots and wire types
//! - `documents`: typed content documents with built-in defaults
//! - `store`: server-side content store
//! - `cache`: local snapshot cache
//! - `sync`: sync client, transport, poll loop and notification bus
//! - `editor`: editors and viewers built on the sync client
//! - `config`: application configuration

pub mod cache;
pub mod config;
pub mod documents;
pub mod editor;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use cache::{CacheError, SnapshotCache, StoreOutcome};
pub use config::Config;
pub use documents::{
    ContentDocument, HeaderLines, Project, ProjectList, Skill, SkillList, Tagline,
    UploadedImage, UploadedImageList, VerifiedContent,
};
pub use editor::{ContentEditor, SaveOutcome, Source, Viewer};
pub use error::SyncError;
pub use models::{ContentKey, ContentSnapshot, ContentValue};
pub use store::{ContentError, ContentStore};
pub use sync::{
    ChangeNotification, ContentApi, HttpContentApi, InProcessContentApi, Loaded,
    NotificationBus, PollHandle, RetryPolicy, SyncClient, SyncState,
};

/// Current wall-clock time in epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

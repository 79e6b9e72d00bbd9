//! Sync client for the folio content API
//!
//! Keeps every editor and viewer of a process consistent with the shared
//! content store without a push channel.
//!
//! ## Model
//!
//! 1. Reads fall back server → local cache → built-in default
//! 2. Writes go to the local cache first, then to the server once; a
//!    network failure is returned, never swallowed
//! 3. A successful write is published on the [`NotificationBus`] before the
//!    call returns, so same-process consumers never wait for a poll
//! 4. Poll loops apply a snapshot only if its `lastUpdated` is strictly
//!    newer than what they have seen (see [`SyncState`])
//!
//! Concurrent writers race: the later write wins, with no version check.
//!
//! ## Usage
//!
//! ```ignore
//! let client = SyncClient::new(HttpContentApi::new("http://127.0.0.1:3000")?, cache);
//! let _sub = client.subscribe(ContentKey::Tagline, |n| {
//!     println!("tagline is now {}", n.payload);
//!     Ok(())
//! });
//! let handle = client.start_sync(Duration::from_secs(3));
//! ```

mod bus;
mod client;
mod retry;
mod state;
mod transport;

pub use bus::{ChangeNotification, Handler, NotificationBus, PublishReport, Subscription};
pub use client::{Loaded, PollHandle, Resolved, Source, SyncClient, WriteAck};
pub use retry::RetryPolicy;
pub use state::SyncState;
pub use transport::{ContentApi, HttpContentApi, InProcessContentApi, DEFAULT_REQUEST_TIMEOUT};

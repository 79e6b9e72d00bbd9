//! Local snapshot cache
//!
//! Durable, best-effort client-side copy of the last known value of each
//! content key. Used for first paint and offline fallback, and written
//! through on every local edit.
//!
//! ## Slots
//!
//! Each key owns up to three slots:
//! - `<key>`: primary envelope
//! - `<key>_backup`: copy of the primary, consulted when the primary is
//!   missing, stale or corrupt, and promoted back on a hit
//! - `<key>_compressed`: gzip-compressed envelope, written instead of the
//!   primary/backup pair when the plain write does not fit the quota
//!
//! A stale, schema-mismatched or corrupt entry is a miss, never an error.

pub mod backend;
pub mod envelope;
pub mod error;
pub mod schema;

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ContentKey, ContentValue};
use crate::now_millis;

pub use backend::{MemoryBackend, SnapshotBackend, SqliteBackend};
pub use envelope::{CacheEntry, CACHE_SCHEMA_VERSION};
pub use error::{CacheError, CacheResult};

/// Result of a cache write
#[derive(Debug)]
pub enum StoreOutcome {
    /// Written to the primary slot (and its backup when it fit)
    Stored,
    /// The plain entry did not fit; a compressed copy was stored instead
    Compacted {
        original_bytes: usize,
        stored_bytes: usize,
    },
    /// Nothing could be persisted locally; the value lives only in memory
    /// and on the server
    Degraded(CacheError),
}

impl StoreOutcome {
    /// Whether a subsequent `read` returns the value just written
    pub fn is_persisted(&self) -> bool {
        !matches!(self, StoreOutcome::Degraded(_))
    }

    pub fn degraded(&self) -> Option<&CacheError> {
        match self {
            StoreOutcome::Degraded(e) => Some(e),
            _ => None,
        }
    }
}

fn backup_slot(key: &str) -> String {
    format!("{}_backup", key)
}

fn compressed_slot(key: &str) -> String {
    format!("{}_compressed", key)
}

/// Client-side snapshot cache
pub struct SnapshotCache {
    backend: Mutex<Box<dyn SnapshotBackend>>,
    ttl: Duration,
    seen_version: Mutex<Option<i64>>,
}

impl SnapshotCache {
    /// Open the SQLite cache described by `config`
    pub fn open(config: &Config) -> CacheResult<Self> {
        let backend = SqliteBackend::open(&config.cache_path(), config.cache_quota_bytes)?;
        Ok(Self::with_backend(
            backend,
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    /// Process-local cache with the given quota
    pub fn in_memory(quota: u64, ttl: Duration) -> Self {
        Self::with_backend(MemoryBackend::new(quota), ttl)
    }

    pub fn with_backend(backend: impl SnapshotBackend + 'static, ttl: Duration) -> Self {
        let seen = backend.data_version().ok().flatten();
        Self {
            backend: Mutex::new(Box::new(backend)),
            ttl,
            seen_version: Mutex::new(seen),
        }
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Box<dyn SnapshotBackend>>> {
        self.backend.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Store with the default TTL
    pub fn store(&self, key: &str, value: &str) -> StoreOutcome {
        self.store_with_ttl(key, value, self.ttl)
    }

    /// Store `value` under `key`
    ///
    /// Never fails outright: a rejected write comes back as
    /// [`StoreOutcome::Degraded`] after logging.
    pub fn store_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreOutcome {
        let entry = CacheEntry::new(value, ttl, now_millis());
        let bytes = match entry.encode() {
            Ok(b) => b,
            Err(e) => return StoreOutcome::Degraded(e),
        };

        let mut backend = match self.lock() {
            Ok(b) => b,
            Err(e) => return StoreOutcome::Degraded(e),
        };

        match backend.set(key, &bytes) {
            Ok(()) => {
                if let Err(e) = backend.set(&backup_slot(key), &bytes) {
                    // An older backup must not outlive the primary it shadowed
                    debug!("Backup slot for '{}' skipped: {}", key, e);
                    if let Err(e) = backend.remove(&backup_slot(key)) {
                        warn!("Stale backup for '{}' could not be evicted: {}", key, e);
                    }
                }
                if let Err(e) = backend.remove(&compressed_slot(key)) {
                    warn!("Stale compressed copy of '{}' could not be evicted: {}", key, e);
                }
                debug!("Cached '{}' ({} bytes)", key, bytes.len());
                StoreOutcome::Stored
            }
            Err(e) if e.is_quota() => {
                warn!("Cache quota exceeded for '{}', compacting: {}", key, e);
                store_compacted(&mut **backend, key, &bytes)
            }
            Err(e) => {
                warn!("Cache write for '{}' failed, continuing network-only: {}", key, e);
                StoreOutcome::Degraded(e)
            }
        }
    }

    /// Read the freshest valid entry for `key`
    ///
    /// Order: primary, backup (promoted to primary on a hit), compressed.
    pub fn read(&self, key: &str) -> Option<String> {
        let now = now_millis();
        let mut backend = match self.lock() {
            Ok(b) => b,
            Err(e) => {
                warn!("Cache read for '{}' skipped: {}", key, e);
                return None;
            }
        };

        if let Some(entry) = fresh_entry(&**backend, key, now, false) {
            return Some(entry.payload);
        }

        let backup = backup_slot(key);
        if let Some(entry) = fresh_entry(&**backend, &backup, now, false) {
            info!("Using backup cache entry for '{}'", key);
            match entry.encode() {
                Ok(bytes) => {
                    if let Err(e) = backend.set(key, &bytes) {
                        debug!("Could not promote backup for '{}': {}", key, e);
                    }
                }
                Err(e) => debug!("Could not re-encode backup for '{}': {}", key, e),
            }
            return Some(entry.payload);
        }

        fresh_entry(&**backend, &compressed_slot(key), now, true).map(|e| e.payload)
    }

    /// Drop every slot of `key`
    pub fn remove(&self, key: &str) -> CacheResult<()> {
        let mut backend = self.lock()?;
        backend.remove(key)?;
        backend.remove(&backup_slot(key))?;
        backend.remove(&compressed_slot(key))?;
        Ok(())
    }

    pub fn store_content(&self, key: ContentKey, value: &ContentValue) -> StoreOutcome {
        self.store(key.as_str(), value.as_str())
    }

    pub fn read_content(&self, key: ContentKey) -> Option<ContentValue> {
        self.read(key.as_str()).map(ContentValue::from)
    }

    /// Bytes currently charged against the quota
    pub fn used_bytes(&self) -> CacheResult<u64> {
        self.lock()?.used_bytes()
    }

    /// Whether another process committed to the cache since the last call
    ///
    /// A hint only: the caller should re-fetch, not trust the cache.
    pub fn changed_externally(&self) -> bool {
        let current = match self.lock().and_then(|b| b.data_version()) {
            Ok(v) => v,
            Err(e) => {
                debug!("Cache change check failed: {}", e);
                return false;
            }
        };

        let Ok(mut seen) = self.seen_version.lock() else {
            return false;
        };
        let changed = matches!((*seen, current), (Some(old), Some(new)) if old != new);
        *seen = current;
        changed
    }
}

/// Load and validate one slot; anything unusable is a miss
fn fresh_entry(
    backend: &dyn SnapshotBackend,
    slot: &str,
    now: i64,
    compressed: bool,
) -> Option<CacheEntry> {
    let raw = match backend.get(slot) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Cache read of '{}' failed: {}", slot, e);
            return None;
        }
    };

    let decoded = if compressed {
        envelope::decompress(slot, &raw).and_then(|bytes| CacheEntry::decode(slot, &bytes))
    } else {
        CacheEntry::decode(slot, &raw)
    };

    match decoded {
        Ok(entry) if entry.is_fresh(now) => Some(entry),
        Ok(_) => {
            debug!("Cache entry '{}' is stale or from another schema", slot);
            None
        }
        Err(e) => {
            warn!("Ignoring cache entry: {}", e);
            None
        }
    }
}

/// Replace the key's slots with a gzip-compressed copy of the envelope
fn store_compacted(backend: &mut dyn SnapshotBackend, key: &str, bytes: &[u8]) -> StoreOutcome {
    let packed = match envelope::compress(bytes) {
        Ok(p) => p,
        Err(e) => return StoreOutcome::Degraded(e),
    };

    // The old primary/backup are superseded by this write either way; evicting
    // them first frees their space and keeps a later read from returning them.
    if let Err(e) = backend
        .remove(key)
        .and_then(|_| backend.remove(&backup_slot(key)))
    {
        warn!("Could not evict old cache slots for '{}': {}", key, e);
        return StoreOutcome::Degraded(e);
    }

    match backend.set(&compressed_slot(key), &packed) {
        Ok(()) => {
            info!(
                "Stored compacted cache entry for '{}' ({} -> {} bytes)",
                key,
                bytes.len(),
                packed.len()
            );
            StoreOutcome::Compacted {
                original_bytes: bytes.len(),
                stored_bytes: packed.len(),
            }
        }
        Err(e) => {
            warn!(
                "Cache write for '{}' failed even compacted, continuing network-only: {}",
                key, e
            );
            StoreOutcome::Degraded(e)
        }
    }
}

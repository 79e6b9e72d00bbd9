//! Storage backends for the snapshot cache
//!
//! A backend is a byte-budgeted slot store, the moral equivalent of a
//! browser's per-origin key/value storage. `SqliteBackend` persists across
//! restarts; `MemoryBackend` lives as long as the process.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::error::{CacheError, CacheResult};
use super::schema::{init_schema, needs_init};

/// A quota-enforcing slot store
pub trait SnapshotBackend: Send {
    fn get(&self, slot: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store bytes under `slot`, replacing any previous value
    ///
    /// Fails with [`CacheError::QuotaExceeded`] if the total size of all
    /// slots would exceed the quota. A failed write changes nothing.
    fn set(&mut self, slot: &str, bytes: &[u8]) -> CacheResult<()>;

    fn remove(&mut self, slot: &str) -> CacheResult<()>;

    /// Bytes currently charged against the quota
    fn used_bytes(&self) -> CacheResult<u64>;

    /// Counter that moves when *another* connection commits
    ///
    /// `None` when the backend cannot be shared between processes.
    fn data_version(&self) -> CacheResult<Option<i64>> {
        Ok(None)
    }
}

fn charge(slot: &str, bytes: &[u8]) -> u64 {
    (slot.len() + bytes.len()) as u64
}

/// SQLite-backed slot store
pub struct SqliteBackend {
    conn: Connection,
    quota: u64,
}

impl SqliteBackend {
    /// Open (or create) the cache database at `path`
    pub fn open(path: &Path, quota: u64) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::from_connection(conn, quota)
    }

    /// In-memory database, mostly useful for tests
    pub fn open_in_memory(quota: u64) -> CacheResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, quota)
    }

    fn from_connection(conn: Connection, quota: u64) -> CacheResult<Self> {
        if needs_init(&conn) {
            debug!("Initializing snapshot cache schema");
            init_schema(&conn)?;
        }
        Ok(Self { conn, quota })
    }
}

impl SnapshotBackend for SqliteBackend {
    fn get(&self, slot: &str) -> CacheResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM snapshots WHERE slot = ?1",
                [slot],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, slot: &str, bytes: &[u8]) -> CacheResult<()> {
        let tx = self.conn.transaction()?;

        let others: i64 = tx.query_row(
            "SELECT COALESCE(SUM(LENGTH(slot) + LENGTH(value)), 0) FROM snapshots WHERE slot != ?1",
            [slot],
            |row| row.get(0),
        )?;
        let needed = others.max(0) as u64 + charge(slot, bytes);
        if needed > self.quota {
            return Err(CacheError::QuotaExceeded {
                slot: slot.to_string(),
                needed,
                quota: self.quota,
            });
        }

        tx.execute(
            "INSERT OR REPLACE INTO snapshots (slot, value, updated_at) VALUES (?1, ?2, ?3)",
            params![slot, bytes, crate::now_millis()],
        )
        .map_err(|e| CacheError::from_sqlite(e, slot))?;
        tx.commit().map_err(|e| CacheError::from_sqlite(e, slot))?;
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM snapshots WHERE slot = ?1", [slot])?;
        Ok(())
    }

    fn used_bytes(&self) -> CacheResult<u64> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(slot) + LENGTH(value)), 0) FROM snapshots",
            [],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as u64)
    }

    fn data_version(&self) -> CacheResult<Option<i64>> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(Some(version))
    }
}

/// Process-local slot store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: HashMap<String, Vec<u8>>,
    quota: u64,
}

impl MemoryBackend {
    pub fn new(quota: u64) -> Self {
        Self {
            slots: HashMap::new(),
            quota,
        }
    }
}

impl SnapshotBackend for MemoryBackend {
    fn get(&self, slot: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.slots.get(slot).cloned())
    }

    fn set(&mut self, slot: &str, bytes: &[u8]) -> CacheResult<()> {
        let others: u64 = self
            .slots
            .iter()
            .filter(|(k, _)| k.as_str() != slot)
            .map(|(k, v)| charge(k, v))
            .sum();
        let needed = others + charge(slot, bytes);
        if needed > self.quota {
            return Err(CacheError::QuotaExceeded {
                slot: slot.to_string(),
                needed,
                quota: self.quota,
            });
        }
        self.slots.insert(slot.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> CacheResult<()> {
        self.slots.remove(slot);
        Ok(())
    }

    fn used_bytes(&self) -> CacheResult<u64> {
        Ok(self.slots.iter().map(|(k, v)| charge(k, v)).sum())
    }
}

//! Per-consumer sync state
//!
//! Tracks the highest `lastUpdated` a consumer has already applied, so poll
//! results that are not strictly newer are dropped.

use tracing::debug;

/// Timestamp gate for one consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    last_seen: Option<i64>,
}

impl SyncState {
    /// A consumer that has applied nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A consumer that already reconciled against `timestamp`
    pub fn seen(timestamp: i64) -> Self {
        Self {
            last_seen: Some(timestamp),
        }
    }

    /// Highest timestamp applied so far
    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }

    /// Record `timestamp` if it is strictly newer than anything seen
    ///
    /// Returns whether the caller should apply the result.
    pub fn observe(&mut self, timestamp: i64) -> bool {
        match self.last_seen {
            Some(seen) if timestamp <= seen => {
                debug!("Dropping snapshot at {} (already at {})", timestamp, seen);
                false
            }
            _ => {
                self.last_seen = Some(timestamp);
                true
            }
        }
    }
}

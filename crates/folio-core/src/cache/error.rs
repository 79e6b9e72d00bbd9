//! Cache error handling
//!
//! Provides typed errors for local snapshot cache operations with
//! descriptive messages and recovery suggestions.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur in the local snapshot cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The write would push the cache past its byte budget
    #[error("Cache quota exceeded writing '{slot}': {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { slot: String, needed: u64, quota: u64 },

    /// The database file itself ran out of space
    #[error("Disk full while writing cache slot '{slot}'")]
    DiskFull { slot: String },

    /// Failed to create the cache directory
    #[error("Failed to create cache directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Envelope serialization or compression failed
    #[error("Failed to encode cache entry: {0}")]
    Encoding(String),

    /// A stored entry could not be decoded
    #[error("Corrupt cache entry in '{slot}': {details}")]
    Corrupt { slot: String, details: String },

    /// The cache lock was poisoned by a panicking writer
    #[error("Cache lock poisoned")]
    Poisoned,

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CacheError {
    /// Classify a SQLite error raised while writing `slot`
    ///
    /// SQLITE_FULL becomes `DiskFull` so it is handled like a quota rejection.
    pub fn from_sqlite(error: rusqlite::Error, slot: &str) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DiskFull => {
                CacheError::DiskFull {
                    slot: slot.to_string(),
                }
            }
            _ => CacheError::Database(error),
        }
    }

    /// Whether the cache refused the write for lack of space
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            CacheError::QuotaExceeded { .. } | CacheError::DiskFull { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CacheError::QuotaExceeded { .. } => Some(
                "Raise cache_quota_bytes, or reference uploaded images by URL instead of embedding them.",
            ),
            CacheError::DiskFull { .. } => Some("Free up disk space and try again."),
            CacheError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            CacheError::Corrupt { .. } => {
                Some("The entry is ignored; the next successful sync overwrites it.")
            }
            _ => None,
        }
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_classification() {
        let err = CacheError::QuotaExceeded {
            slot: "projects-list".into(),
            needed: 10,
            quota: 5,
        };
        assert!(err.is_quota());
        assert!(err.recovery_suggestion().is_some());

        let err = CacheError::Encoding("bad".into());
        assert!(!err.is_quota());
    }

    #[test]
    fn test_disk_full_from_sqlite() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        let err = CacheError::from_sqlite(sqlite_err, "skills-list");

        assert!(matches!(err, CacheError::DiskFull { .. }));
        assert!(err.is_quota());
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::QuotaExceeded {
            slot: "uploaded-images-list".into(),
            needed: 6_000_000,
            quota: 5_242_880,
        };
        let msg = err.to_string();
        assert!(msg.contains("quota exceeded"));
        assert!(msg.contains("uploaded-images-list"));
    }
}

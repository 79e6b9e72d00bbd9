//! Sync error taxonomy
//!
//! Every failure the sync layer can surface maps to one of four kinds:
//! transport, validation, local storage quota, or parse. Reads degrade
//! through the fallback chain; writes surface the error to the caller.

use thiserror::Error;

use crate::cache::CacheError;
use crate::models::ContentKey;

/// Errors surfaced by the sync client
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network unreachable, timeout, or the request could not be sent
    #[error("Transport failure talking to {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The server rejected the payload for a specific key
    #[error("Rejected write to '{key}': {message}")]
    Validation { key: String, message: String },

    /// The local cache refused the write
    #[error("Local cache rejected write for '{key}': {source}")]
    StorageQuota {
        key: ContentKey,
        #[source]
        source: CacheError,
    },

    /// A stored or fetched value is not well-formed
    #[error("Malformed payload for {what}: {details}")]
    Parse { what: String, details: String },

    /// The operation was cancelled before its result could be applied
    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create a transport error from any displayable cause
    pub fn transport(url: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        SyncError::Transport {
            url: url.into(),
            message: cause.to_string(),
        }
    }

    /// Create a parse error from any displayable cause
    pub fn parse(what: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        SyncError::Parse {
            what: what.into(),
            details: cause.to_string(),
        }
    }

    /// Whether a later attempt could plausibly succeed
    ///
    /// Validation and parse failures are deterministic; retrying them only
    /// repeats the same answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { .. } => true,
            SyncError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

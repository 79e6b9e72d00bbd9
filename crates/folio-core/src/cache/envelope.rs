//! Cache entry envelope
//!
//! Every slot stores its payload wrapped with a schema version and an
//! expiry so stale or foreign-format entries read as a miss.

use std::io::{Read, Write};
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use super::error::{CacheError, CacheResult};

/// Envelope format version; entries with any other version are ignored
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// A cached payload plus its staleness metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub schema_version: u32,
    pub payload: String,
    /// Epoch milliseconds
    pub written_at: i64,
    /// Epoch milliseconds; the entry is stale from this instant on
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn new(payload: impl Into<String>, ttl: Duration, now: i64) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            payload: payload.into(),
            written_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    /// Current schema and not yet expired
    pub fn is_fresh(&self, now: i64) -> bool {
        self.schema_version == CACHE_SCHEMA_VERSION && self.expires_at > now
    }

    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Encoding(e.to_string()))
    }

    pub fn decode(slot: &str, bytes: &[u8]) -> CacheResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt {
            slot: slot.to_string(),
            details: e.to_string(),
        })
    }
}

/// Gzip an encoded envelope
pub fn compress(bytes: &[u8]) -> CacheResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity((bytes.len() / 2).max(256)),
        Compression::best(),
    );
    encoder
        .write_all(bytes)
        .map_err(|e| CacheError::Encoding(format!("gzip encoding failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| CacheError::Encoding(format!("gzip finalize failed: {}", e)))
}

/// Reverse of [`compress`]
pub fn decompress(slot: &str, bytes: &[u8]) -> CacheResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Corrupt {
            slot: slot.to_string(),
            details: format!("gzip decoding failed: {}", e),
        })?;
    Ok(out)
}

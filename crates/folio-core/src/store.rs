//! Server-side content store
//!
//! The `ContentStore` holds the authoritative value of every content key for
//! the lifetime of the server process. There is no durability across
//! restarts and no concurrency control: a write replaces the whole value of
//! its key unconditionally (last write wins) and bumps `lastUpdated`.
//!
//! ## Usage
//!
//! ```ignore
//! let store = ContentStore::new();
//! let ts = store.write(Some("tagline"), Some(json!("Hello")))?;
//! assert_eq!(store.snapshot().last_updated(), ts);
//! ```

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ContentKey, ContentSnapshot, ContentValue};
use crate::now_millis;

/// Errors returned by [`ContentStore::write`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContentError {
    /// The request named no content type
    #[error("Missing data type")]
    MissingKey,

    /// The request named a type the store does not know
    #[error("Unknown content type: '{0}'")]
    UnknownKey(String),

    /// The request carried no content
    #[error("Missing content data")]
    MissingContent,

    /// The content was present but empty
    #[error("Empty content for '{0}'")]
    EmptyContent(ContentKey),

    /// Projects content did not parse as a JSON array
    #[error("Invalid projects data format: {0}")]
    InvalidProjects(String),

    /// Unexpected failure inside the store
    #[error("Failed to update content: {0}")]
    Internal(String),
}

impl ContentError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ContentError::Internal(_) => 500,
            _ => 400,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    values: BTreeMap<ContentKey, ContentValue>,
    last_updated: i64,
}

/// Process-lifetime content store
#[derive(Debug)]
pub struct ContentStore {
    state: RwLock<StoreState>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Create an empty store stamped with the current time
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                values: BTreeMap::new(),
                last_updated: now_millis(),
            }),
        }
    }

    /// Read the whole store
    pub fn snapshot(&self) -> Result<ContentSnapshot, ContentError> {
        let state = self
            .state
            .read()
            .map_err(|_| ContentError::Internal("content store lock poisoned".to_string()))?;

        let snapshot = state
            .values
            .iter()
            .fold(ContentSnapshot::new(state.last_updated), |snap, (k, v)| {
                snap.with(*k, v.clone())
            });
        Ok(snapshot)
    }

    /// Read one key
    pub fn get(&self, key: ContentKey) -> Result<Option<ContentValue>, ContentError> {
        let state = self
            .state
            .read()
            .map_err(|_| ContentError::Internal("content store lock poisoned".to_string()))?;
        Ok(state.values.get(&key).cloned())
    }

    /// Validate and apply a whole-field write, returning the new `lastUpdated`
    ///
    /// A rejected write leaves the store untouched.
    pub fn write(&self, kind: Option<&str>, content: Option<Value>) -> Result<i64, ContentError> {
        let kind = kind.ok_or(ContentError::MissingKey)?;
        let content = content.ok_or(ContentError::MissingContent)?;
        let key: ContentKey = kind
            .parse()
            .map_err(|_| ContentError::UnknownKey(kind.to_string()))?;

        let value = normalize(key, content)?;

        let mut state = self
            .state
            .write()
            .map_err(|_| ContentError::Internal("content store lock poisoned".to_string()))?;

        // Two writes in the same millisecond still get distinct timestamps.
        let stamp = now_millis().max(state.last_updated + 1);
        state.values.insert(key, value);
        state.last_updated = stamp;

        debug!("Stored {} (lastUpdated={})", key, stamp);
        Ok(stamp)
    }
}

/// Turn request content into the stored value for `key`
fn normalize(key: ContentKey, content: Value) -> Result<ContentValue, ContentError> {
    if is_empty(&content) {
        return Err(ContentError::EmptyContent(key));
    }

    if key == ContentKey::Projects {
        return normalize_projects(content);
    }

    Ok(match content {
        Value::String(s) => ContentValue::new(s),
        other => ContentValue::new(other.to_string()),
    })
}

fn normalize_projects(content: Value) -> Result<ContentValue, ContentError> {
    match content {
        Value::String(raw) => {
            let parsed: Value = serde_json::from_str(&raw).map_err(|e| {
                warn!("Invalid projects data: {}", e);
                ContentError::InvalidProjects(e.to_string())
            })?;
            if !parsed.is_array() {
                return Err(ContentError::InvalidProjects(
                    "Projects data must be an array".to_string(),
                ));
            }
            Ok(ContentValue::new(raw))
        }
        Value::Array(_) => Ok(ContentValue::new(content.to_string())),
        _ => Err(ContentError::InvalidProjects(
            "Projects data must be an array".to_string(),
        )),
    }
}

fn is_empty(content: &Value) -> bool {
    match content {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

//! Data models for folio
//!
//! Defines the content keys, opaque content values, full-store snapshots and
//! the request/response bodies exchanged with the content API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Logical field names held by the content store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentKey {
    /// The four animated lines of the landing page header
    #[serde(rename = "header-lines")]
    HeaderLines,
    /// Short tagline shown under the header
    #[serde(rename = "tagline")]
    Tagline,
    /// Skills carousel
    #[serde(rename = "skills-list")]
    Skills,
    /// Project photo grid
    #[serde(rename = "projects-list")]
    Projects,
    /// Images uploaded through the admin panel
    #[serde(rename = "uploaded-images-list")]
    UploadedImages,
    /// About text, photo, academic results and FAQs
    #[serde(rename = "verified-section-blob")]
    Verified,
}

impl ContentKey {
    /// Every key, in wire order
    pub const ALL: [ContentKey; 6] = [
        ContentKey::HeaderLines,
        ContentKey::Tagline,
        ContentKey::Skills,
        ContentKey::Projects,
        ContentKey::UploadedImages,
        ContentKey::Verified,
    ];

    /// Wire name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKey::HeaderLines => "header-lines",
            ContentKey::Tagline => "tagline",
            ContentKey::Skills => "skills-list",
            ContentKey::Projects => "projects-list",
            ContentKey::UploadedImages => "uploaded-images-list",
            ContentKey::Verified => "verified-section-blob",
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown key name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content type: '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for ContentKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Opaque serialized document stored under a key
///
/// Usually JSON text; the tagline is stored as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentValue(String);

impl ContentValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Serialize a document as JSON text
    pub fn from_json<T: Serialize>(doc: &T) -> serde_json::Result<Self> {
        serde_json::to_string(doc).map(Self)
    }

    /// Parse the value as a JSON document
    pub fn parse_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ContentValue {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentValue {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ContentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The whole content store as returned by `GET /content`
///
/// Wire shape: `{ "<key>": value | null, ..., "lastUpdated": <epoch ms> }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "WireSnapshot", into = "WireSnapshot")]
pub struct ContentSnapshot {
    values: BTreeMap<ContentKey, ContentValue>,
    last_updated: i64,
}

impl ContentSnapshot {
    pub fn new(last_updated: i64) -> Self {
        Self {
            values: BTreeMap::new(),
            last_updated,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: ContentKey, value: impl Into<ContentValue>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: ContentKey) -> Option<&ContentValue> {
        self.values.get(&key)
    }

    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContentKey, &ContentValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Keys whose value differs from `previous` (all present keys if none)
    ///
    /// A key that disappeared is not reported: the store never deletes.
    pub fn changed_since(&self, previous: Option<&ContentSnapshot>) -> Vec<ContentKey> {
        self.values
            .iter()
            .filter(|(key, value)| previous.and_then(|p| p.get(**key)) != Some(*value))
            .map(|(key, _)| *key)
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct WireSnapshot {
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
    #[serde(rename = "lastUpdated", default)]
    last_updated: i64,
}

impl From<WireSnapshot> for ContentSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        let mut values = BTreeMap::new();
        for (name, value) in wire.fields {
            let Ok(key) = name.parse::<ContentKey>() else {
                debug!("Ignoring unknown field '{}' in snapshot", name);
                continue;
            };
            match value {
                Value::Null => {}
                Value::String(s) => {
                    values.insert(key, ContentValue(s));
                }
                other => {
                    values.insert(key, ContentValue(other.to_string()));
                }
            }
        }
        Self {
            values,
            last_updated: wire.last_updated,
        }
    }
}

impl From<ContentSnapshot> for WireSnapshot {
    fn from(snapshot: ContentSnapshot) -> Self {
        let mut fields = serde_json::Map::new();
        for key in ContentKey::ALL {
            let value = snapshot
                .values
                .get(&key)
                .map(|v| Value::String(v.0.clone()))
                .unwrap_or(Value::Null);
            fields.insert(key.as_str().to_string(), value);
        }
        Self {
            fields,
            last_updated: snapshot.last_updated,
        }
    }
}

/// Body of `POST /content`
///
/// Both fields are optional on the wire so the server can answer a missing
/// field with a descriptive validation message instead of a decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
}

impl WriteRequest {
    pub fn new(key: ContentKey, value: &ContentValue) -> Self {
        Self {
            kind: Some(key.as_str().to_string()),
            content: Some(Value::String(value.as_str().to_string())),
        }
    }
}

/// Response of `POST /content`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl WriteResponse {
    pub fn ok(last_updated: i64) -> Self {
        Self {
            success: true,
            message: Some("Content updated successfully".to_string()),
            last_updated: Some(last_updated),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            last_updated: None,
        }
    }
}

/// Response of `POST /upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn stored(file_url: String, file_name: String, original_name: String) -> Self {
        Self {
            success: true,
            file_url: Some(file_url),
            file_name: Some(file_name),
            original_name: Some(original_name),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_url: None,
            file_name: None,
            original_name: None,
            message: Some(message.into()),
        }
    }
}

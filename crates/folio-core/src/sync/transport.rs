//! Content API transports
//!
//! [`ContentApi`] is the narrow read-all/write-one interface the sync client
//! talks to. `HttpContentApi` speaks the JSON API of `folio-server`;
//! `InProcessContentApi` calls a shared [`ContentStore`] directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::models::{
    ContentKey, ContentSnapshot, ContentValue, UploadResponse, WriteRequest, WriteResponse,
};
use crate::store::{ContentError, ContentStore};

/// Default per-request timeout for the HTTP transport
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-all / write-one access to the content store
pub trait ContentApi: Send + Sync + 'static {
    /// Read the whole store
    fn fetch_all(&self) -> impl Future<Output = SyncResult<ContentSnapshot>> + Send;

    /// Replace one field, returning the store's new `lastUpdated`
    fn write(
        &self,
        key: ContentKey,
        value: &ContentValue,
    ) -> impl Future<Output = SyncResult<i64>> + Send;

    /// Store a file and return where it is served from
    fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = SyncResult<UploadResponse>> + Send;

    /// Human-readable location, for logs and status output
    fn endpoint(&self) -> String;
}

// ==================== HTTP ====================

/// JSON-over-HTTP transport
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: Client,
    base_url: String,
}

impl HttpContentApi {
    pub fn new(base_url: &str) -> SyncResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport(base_url, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL for a path the server returned, such as an upload's `fileUrl`
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            self.url(path)
        }
    }
}

/// Pull `message` out of a `{success: false, message}` body, if there is one
fn failure_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

impl ContentApi for HttpContentApi {
    async fn fetch_all(&self) -> SyncResult<ContentSnapshot> {
        let url = self.url("/content");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                message: failure_message(&body).unwrap_or(body),
            });
        }

        let snapshot: ContentSnapshot =
            serde_json::from_str(&body).map_err(|e| SyncError::parse("content snapshot", e))?;
        debug!(
            "Fetched snapshot from {} (lastUpdated={})",
            url,
            snapshot.last_updated()
        );
        Ok(snapshot)
    }

    async fn write(&self, key: ContentKey, value: &ContentValue) -> SyncResult<i64> {
        let url = self.url("/content");
        let response = self
            .client
            .post(&url)
            .json(&WriteRequest::new(key, value))
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        if status == StatusCode::BAD_REQUEST {
            return Err(SyncError::Validation {
                key: key.to_string(),
                message: failure_message(&body).unwrap_or(body),
            });
        }
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                message: failure_message(&body).unwrap_or(body),
            });
        }

        let reply: WriteResponse =
            serde_json::from_str(&body).map_err(|e| SyncError::parse("write response", e))?;
        match reply {
            WriteResponse {
                success: true,
                last_updated: Some(ts),
                ..
            } => Ok(ts),
            WriteResponse { success: true, .. } => Err(SyncError::parse(
                "write response",
                "missing lastUpdated",
            )),
            WriteResponse { message, .. } => Err(SyncError::Validation {
                key: key.to_string(),
                message: message.unwrap_or_else(|| "write rejected".to_string()),
            }),
        }
    }

    async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<UploadResponse> {
        let url = self.url("/upload");
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| SyncError::transport(&url, e))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let reply: UploadResponse = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(SyncError::Status {
                    status: status.as_u16(),
                    message: body,
                })
            }
            Err(e) => return Err(SyncError::parse("upload response", e)),
        };

        if !status.is_success() || !reply.success {
            return Err(SyncError::Status {
                status: status.as_u16(),
                message: reply
                    .message
                    .unwrap_or_else(|| "upload failed".to_string()),
            });
        }
        Ok(reply)
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}

// ==================== In-process ====================

/// Transport that calls a shared store directly
///
/// Every client built on the same store sees the same content, which makes
/// it a stand-in for several browsers talking to one server.
#[derive(Debug, Clone)]
pub struct InProcessContentApi {
    store: Arc<ContentStore>,
}

impl InProcessContentApi {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }
}

fn store_error(key: Option<ContentKey>, err: ContentError) -> SyncError {
    match (err.status_code(), key) {
        (400, Some(key)) => SyncError::Validation {
            key: key.to_string(),
            message: err.to_string(),
        },
        (status, _) => SyncError::Status {
            status,
            message: err.to_string(),
        },
    }
}

impl ContentApi for InProcessContentApi {
    async fn fetch_all(&self) -> SyncResult<ContentSnapshot> {
        self.store.snapshot().map_err(|e| store_error(None, e))
    }

    async fn write(&self, key: ContentKey, value: &ContentValue) -> SyncResult<i64> {
        self.store
            .write(
                Some(key.as_str()),
                Some(Value::String(value.as_str().to_string())),
            )
            .map_err(|e| store_error(Some(key), e))
    }

    async fn upload(
        &self,
        file_name: &str,
        _mime_type: &str,
        _bytes: Vec<u8>,
    ) -> SyncResult<UploadResponse> {
        Err(SyncError::Status {
            status: 501,
            message: format!("cannot store '{}': no upload directory in-process", file_name),
        })
    }

    fn endpoint(&self) -> String {
        "in-process".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let api = HttpContentApi::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(api.endpoint(), "http://127.0.0.1:3000");
        assert_eq!(
            api.resolve("/uploads/a.png"),
            "http://127.0.0.1:3000/uploads/a.png"
        );
        assert_eq!(api.resolve("https://cdn/x.png"), "https://cdn/x.png");
    }

    #[test]
    fn test_failure_message() {
        assert_eq!(
            failure_message(r#"{"success":false,"message":"Unknown content type"}"#).as_deref(),
            Some("Unknown content type")
        );
        assert_eq!(failure_message("<html>502</html>"), None);
    }

    #[tokio::test]
    async fn test_in_process_round_trip() {
        let api = InProcessContentApi::new(Arc::new(ContentStore::new()));
        let ts = api
            .write(ContentKey::Tagline, &ContentValue::new("Hello"))
            .await
            .unwrap();

        let snapshot = api.fetch_all().await.unwrap();
        assert_eq!(snapshot.last_updated(), ts);
        assert_eq!(
            snapshot.get(ContentKey::Tagline),
            Some(&ContentValue::new("Hello"))
        );
    }

    #[tokio::test]
    async fn test_in_process_validation() {
        let api = InProcessContentApi::new(Arc::new(ContentStore::new()));
        let err = api
            .write(ContentKey::Projects, &ContentValue::new("{not valid json array}"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Nothing listens on the discard port
        let api = HttpContentApi::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = api.fetch_all().await.unwrap_err();

        assert!(matches!(err, SyncError::Transport { .. }));
        assert!(err.is_retryable());
    }
}

//! HTTP error mapping
//!
//! Every failure is answered with `{ "success": false, "message": ... }`
//! and a status code: 4xx for bad requests, 500 for everything else.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_core::models::WriteResponse;
use folio_core::ContentError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// The content store rejected the write
    #[error(transparent)]
    Content(#[from] ContentError),

    /// The request body is not a JSON write request
    #[error("Invalid request body: {0}")]
    Body(String),

    /// The upload form had no `file` field
    #[error("No file provided")]
    NoFile,

    /// The multipart stream could not be read (includes oversized bodies)
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    /// Writing the uploaded file failed
    #[error("Failed to upload file")]
    Storage(#[source] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Content(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Body(_) | ApiError::NoFile => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                ApiError::Storage(source) => error!("{}: {}", self, source),
                _ => error!("{}", self),
            }
        } else {
            warn!("Rejected request ({}): {}", status.as_u16(), self);
        }

        (status, Json(WriteResponse::failed(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ContentError::UnknownKey("siteFoo".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ContentError::Internal("poisoned".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Storage(std::io::Error::other("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_match_api() {
        assert_eq!(ApiError::NoFile.to_string(), "No file provided");
        assert_eq!(
            ApiError::from(ContentError::MissingKey).to_string(),
            "Missing data type"
        );
    }
}

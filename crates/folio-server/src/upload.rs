//! `POST /upload`
//!
//! Stores the multipart `file` field under a collision-resistant name in the
//! uploads directory, which is served back under `/uploads`.

use axum::extract::{Multipart, State};
use axum::Json;
use folio_core::models::UploadResponse;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Replace every character outside `[A-Za-z0-9.-]` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{timestamp}-{random8}-{sanitized name}`
pub fn stored_file_name(original: &str, timestamp_ms: i64) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        timestamp_ms,
        &random[..8],
        sanitize_file_name(original)
    )
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        let file_name = stored_file_name(&original_name, chrono::Utc::now().timestamp_millis());

        tokio::fs::create_dir_all(&state.uploads_dir)
            .await
            .map_err(ApiError::Storage)?;
        tokio::fs::write(state.uploads_dir.join(&file_name), &bytes)
            .await
            .map_err(ApiError::Storage)?;

        info!(
            "Stored upload '{}' as {} ({} bytes)",
            original_name,
            file_name,
            bytes.len()
        );
        return Ok(Json(UploadResponse::stored(
            format!("/uploads/{}", file_name),
            file_name,
            original_name,
        )));
    }

    Err(ApiError::NoFile)
}

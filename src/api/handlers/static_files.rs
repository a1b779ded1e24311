use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::AppState;

/// Serve the bytes of an attachment.
/// Route: GET /files/:attachment_id/:filename
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path((attachment_id, filename)): Path<(u64, String)>,
) -> Result<Response, ApiError> {
    // Look up attachment metadata; the filename segment must match
    let attachment = state
        .db
        .get_attachment(attachment_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .filter(|a| a.filename() == filename)
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    // Fetch content from object storage
    let data = state
        .object_store
        .get(&attachment.file.path)
        .await
        .map_err(|e| match e {
            crate::object_store::ObjectStoreError::NotFound(_) => {
                ApiError::not_found("File content not found")
            }
            _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
        })?;

    // Build response with appropriate headers
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        attachment
            .file
            .mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(attachment.file.byte_size),
    );

    if let Ok(value) = format!("attachment; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Attachment bytes never change once uploaded
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}

//! Add and delete operations behind the attachment routes.
//!
//! The add permission is enforced by the caller; delete re-checks its
//! permission here on every call.

use axum::http::HeaderValue;
use bytes::Bytes;
use thiserror::Error;

use crate::object_store::ObjectStoreError;
use crate::owner::OwnerReference;
use crate::permissions::{can_delete, User};
use crate::storage::models::{Attachment, FileReference, NewAttachment};
use crate::storage::DatabaseError;
use crate::views::{FieldErrors, UploadForm, FILE_FIELD};
use crate::AppState;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The upload payload failed validation; carries the form with field errors.
    #[error("Invalid upload")]
    Invalid(UploadForm),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
}

/// The file part of an upload submission.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Option<Bytes>,
}

/// Store an uploaded file for `owner`, created by `user`.
///
/// Returns the new attachment and the redirect target: `next`, else the owner's
/// canonical page, else `/`.
pub async fn add_attachment(
    state: &AppState,
    user: &User,
    owner: &OwnerReference,
    upload: Upload,
    next: Option<&str>,
) -> Result<(Attachment, String), OperationError> {
    let record = state
        .registry
        .lookup(owner)?
        .ok_or_else(|| {
            OperationError::NotFound(format!(
                "No {} with id {}",
                owner.type_tag, owner.identifier
            ))
        })?;

    let (file_name, data) = validate_upload(&upload, state.config.max_upload_size)
        .map_err(|errors| {
            OperationError::Invalid(UploadForm::new(state.urls.add_url(owner)).with_errors(errors))
        })?;

    let mime_type = upload
        .content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| mime_guess::from_path(&file_name).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let file = FileReference {
        path: FileReference::storage_path(owner, &file_name),
        original_name: file_name,
        mime_type,
        byte_size: data.len() as u64,
    };

    // Phase 1: bytes to object storage
    state.object_store.put(&file.path, data).await?;

    // Phase 2: metadata
    let path = file.path.clone();
    let attachment = match state.db.create_attachment(NewAttachment {
        owner: owner.clone(),
        file,
        creator: user.id.clone(),
    }) {
        Ok(attachment) => attachment,
        Err(e) => {
            // Best-effort cleanup of the uploaded blob
            let _ = state.object_store.delete(&path).await;
            return Err(e.into());
        }
    };

    tracing::debug!(
        attachment_id = attachment.id,
        owner = %owner,
        creator = %user.id,
        "Created attachment"
    );

    let redirect = redirect_target([next, record.canonical_url.as_deref()]);
    Ok((attachment, redirect))
}

/// Delete an attachment if `user` may delete it at this moment.
///
/// Returns the redirect target: `next`, else `referer`, else `/`.
pub async fn delete_attachment(
    state: &AppState,
    user: &User,
    attachment_id: u64,
    next: Option<&str>,
    referer: Option<&str>,
) -> Result<String, OperationError> {
    let attachment = state
        .db
        .get_attachment(attachment_id)?
        .ok_or_else(|| OperationError::NotFound("Attachment not found".to_string()))?;

    if !can_delete(state.permissions.as_ref(), user, &attachment) {
        return Err(OperationError::PermissionDenied(format!(
            "user '{}' may not delete attachment {}",
            user.id, attachment.id
        )));
    }

    // Phase 1: remove metadata
    let Some(removed) = state.db.delete_attachment(attachment_id)? else {
        return Err(OperationError::NotFound("Attachment not found".to_string()));
    };

    // Phase 2: remove blob (best-effort)
    if let Err(e) = state.object_store.delete(&removed.file.path).await {
        tracing::warn!(attachment_id, error = %e, "Failed to delete attachment from object storage");
    }

    tracing::debug!(attachment_id, user = %user.id, "Deleted attachment");

    Ok(redirect_target([next, referer]))
}

/// Forget an owning record and everything attached to it.
///
/// Returns the number of attachments removed.
pub async fn remove_owner(state: &AppState, owner: &OwnerReference) -> Result<usize, OperationError> {
    let (existed, removed) = state.db.delete_owner_with_attachments(owner)?;

    for attachment in &removed {
        if let Err(e) = state.object_store.delete(&attachment.file.path).await {
            tracing::warn!(
                attachment_id = attachment.id,
                error = %e,
                "Failed to delete attachment from object storage"
            );
        }
    }

    if !existed && removed.is_empty() {
        return Err(OperationError::NotFound(format!(
            "No {} with id {}",
            owner.type_tag, owner.identifier
        )));
    }

    tracing::debug!(owner = %owner, attachments = removed.len(), "Removed owner");
    Ok(removed.len())
}

fn validate_upload(upload: &Upload, max_size: u64) -> Result<(String, Bytes), FieldErrors> {
    let mut errors = FieldErrors::new();
    let file_name = upload
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    match (file_name, &upload.data) {
        (Some(name), Some(data)) => {
            if data.is_empty() {
                errors
                    .entry(FILE_FIELD.to_string())
                    .or_default()
                    .push("The submitted file is empty.".to_string());
            } else if data.len() as u64 > max_size {
                errors
                    .entry(FILE_FIELD.to_string())
                    .or_default()
                    .push(format!("File exceeds maximum upload size of {max_size} bytes."));
            } else {
                return Ok((name.to_string(), data.clone()));
            }
        }
        _ => {
            errors
                .entry(FILE_FIELD.to_string())
                .or_default()
                .push("This field is required.".to_string());
        }
    }

    Err(errors)
}

/// First candidate that is non-empty and usable as a `Location` header, else `/`.
fn redirect_target<const N: usize>(candidates: [Option<&str>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|target| !target.is_empty() && HeaderValue::from_str(target).is_ok())
        .unwrap_or("/")
        .to_string()
}

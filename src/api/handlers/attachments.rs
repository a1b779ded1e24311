use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Redirect;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::api::{CurrentUser, MaybeUser};
use crate::operations::{self, Upload};
use crate::owner::{OwnerReference, TypeTag};
use crate::permissions::can_add;
use crate::resolution::resolve_attachments;
use crate::storage::models::Attachment;
use crate::views::{
    build_delete_link_view, build_upload_form_view, DeleteLinkView, UploadFormView, FILE_FIELD,
};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub byte_size: u64,
    pub created_at: String,
    pub creator: String,
    pub delete: DeleteLinkView,
    pub file_url: String,
    pub filename: String,
    pub id: u64,
    pub mime_type: String,
    pub modified_at: String,
    pub original_name: String,
}

#[derive(Debug, Serialize)]
pub struct OwnerAttachmentsResponse {
    pub attachments: Vec<AttachmentResponse>,
    pub owner: String,
    pub upload: UploadFormView,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    #[serde(default)]
    pub next: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Route: POST /add-for/:app_label/:model/:pk/
pub async fn add_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((app_label, model, pk)): Path<(String, String, u64)>,
    AppQuery(params): AppQuery<NextParams>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let owner = owner_from_path(app_label, model, pk)?;

    if !can_add(state.permissions.as_ref(), &user) {
        return Err(ApiError::forbidden(format!(
            "user '{}' may not add attachments",
            user.id
        )));
    }

    let mut upload = Upload::default();
    let mut next = params.next;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            FILE_FIELD => {
                upload.file_name = field.file_name().map(|s| s.to_string());
                upload.content_type = field.content_type().map(|s| s.to_string());

                let data: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }
                upload.data = Some(data);
            }
            "next" => {
                next = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid next: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (_, redirect) =
        operations::add_attachment(&state, &user, &owner, upload, next.as_deref()).await?;

    Ok(Redirect::to(&redirect))
}

/// Route: POST /delete/:attachment_id/
pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(attachment_id): Path<u64>,
    AppQuery(params): AppQuery<NextParams>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());

    let redirect = operations::delete_attachment(
        &state,
        &user,
        attachment_id,
        params.next.as_deref(),
        referer,
    )
    .await?;

    Ok(Redirect::to(&redirect))
}

/// Route: GET /for/:app_label/:model/:pk/
///
/// Lists the owner's attachments with the affordances the caller may use.
pub async fn list_attachments(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path((app_label, model, pk)): Path<(String, String, u64)>,
    AppQuery(params): AppQuery<NextParams>,
) -> Result<Json<JSend<OwnerAttachmentsResponse>>, ApiError> {
    let owner = owner_from_path(app_label, model, pk)?;
    let next = params.next.as_deref();

    let live = state
        .registry
        .lookup(&owner)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some();

    let attachments = resolve_attachments(&state.db, &state.registry, &owner)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let upload = if live {
        build_upload_form_view(
            state.permissions.as_ref(),
            user.as_ref(),
            &owner,
            &state.urls,
            next,
        )
    } else {
        build_upload_form_view(state.permissions.as_ref(), None, &owner, &state.urls, None)
    };

    let attachments = attachments
        .iter()
        .map(|attachment| {
            let delete = build_delete_link_view(
                state.permissions.as_ref(),
                user.as_ref(),
                attachment,
                &state.urls,
                next,
            );
            attachment_to_response(&state, attachment, delete)
        })
        .collect();

    Ok(JSend::success(OwnerAttachmentsResponse {
        attachments,
        owner: owner.to_string(),
        upload,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn owner_from_path(app_label: String, model: String, pk: u64) -> Result<OwnerReference, ApiError> {
    let type_tag =
        TypeTag::new(app_label, model).map_err(|_| ApiError::not_found("Unknown record type"))?;
    Ok(OwnerReference::new(type_tag, pk.to_string()))
}

fn attachment_to_response(
    state: &AppState,
    attachment: &Attachment,
    delete: DeleteLinkView,
) -> AttachmentResponse {
    AttachmentResponse {
        byte_size: attachment.file.byte_size,
        created_at: attachment.created_at.to_rfc3339(),
        creator: attachment.creator.clone(),
        delete,
        file_url: state.urls.file_url(attachment),
        filename: attachment.filename().to_string(),
        id: attachment.id,
        mime_type: attachment.file.mime_type.clone(),
        modified_at: attachment.modified_at.to_rfc3339(),
        original_name: attachment.file.original_name.clone(),
    }
}

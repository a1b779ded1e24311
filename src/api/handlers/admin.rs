use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::operations;
use crate::owner::{OwnerReference, TypeTag};
use crate::permissions::Permission;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub attachments_deleted: u64,
    pub grants_deleted: u64,
    pub owners_deleted: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PutOwnerRequest {
    /// Canonical page of the record; the default redirect after an upload
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub owner: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveOwnerResponse {
    pub attachments_deleted: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PermissionsBody {
    pub permissions: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Route: PUT /_internal/owners/:app_label/:model/:pk
pub async fn put_owner(
    State(state): State<Arc<AppState>>,
    Path((app_label, model, pk)): Path<(String, String, u64)>,
    AppJson(req): AppJson<PutOwnerRequest>,
) -> Result<Json<JSend<OwnerResponse>>, ApiError> {
    let owner = registered_owner(&state, app_label, model, pk)?;
    let url = req.url.filter(|u| !u.trim().is_empty());

    state
        .db
        .put_owner_record(&owner, url.as_deref())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(owner = %owner, "Registered owner");
    Ok(JSend::success(OwnerResponse {
        owner: owner.to_string(),
        url,
    }))
}

/// Route: DELETE /_internal/owners/:app_label/:model/:pk
///
/// Removes the owner together with its attachments.
pub async fn delete_owner(
    State(state): State<Arc<AppState>>,
    Path((app_label, model, pk)): Path<(String, String, u64)>,
) -> Result<Json<JSend<RemoveOwnerResponse>>, ApiError> {
    let owner = registered_owner(&state, app_label, model, pk)?;
    let attachments_deleted = operations::remove_owner(&state, &owner).await?;
    Ok(JSend::success(RemoveOwnerResponse {
        attachments_deleted,
    }))
}

/// Route: GET /_internal/users/:user_id/permissions
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<JSend<PermissionsBody>>, ApiError> {
    let permissions = state
        .db
        .get_user_permissions(&user_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(JSend::success(PermissionsBody { permissions }))
}

/// Route: PUT /_internal/users/:user_id/permissions
///
/// Replaces the user's grants. Unknown permission names are rejected.
pub async fn set_permissions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<PermissionsBody>,
) -> Result<Json<JSend<PermissionsBody>>, ApiError> {
    let permissions: Vec<String> = req
        .permissions
        .iter()
        .map(|name| {
            name.parse::<Permission>()
                .map(|p| p.as_str().to_string())
                .map_err(|e| ApiError::bad_request(e.to_string()))
        })
        .collect::<Result<_, _>>()?;

    state
        .db
        .set_user_permissions(&user_id, &permissions)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let permissions = state
        .db
        .get_user_permissions(&user_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(user = %user_id, ?permissions, "Updated permission grants");
    Ok(JSend::success(PermissionsBody { permissions }))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::warn!(
        attachments = stats.attachments,
        owners = stats.owners,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        attachments_deleted: stats.attachments,
        grants_deleted: stats.grants,
        owners_deleted: stats.owners,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn registered_owner(
    state: &AppState,
    app_label: String,
    model: String,
    pk: u64,
) -> Result<OwnerReference, ApiError> {
    let type_tag =
        TypeTag::new(app_label, model).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !state.registry.contains(&type_tag) {
        return Err(ApiError::not_found(format!(
            "Record type '{type_tag}' is not configured"
        )));
    }
    Ok(OwnerReference::new(type_tag, pk.to_string()))
}

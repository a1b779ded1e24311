use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::response::ApiError;
use crate::permissions::User;
use crate::AppState;

/// The authenticated user, read from the configured identity header.
///
/// Authentication happens upstream; a request without the header is anonymous
/// and rejected with 401.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        parts
            .headers
            .get(state.config.routing.user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| CurrentUser(User::new(id)))
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Like [`CurrentUser`], but anonymous requests are allowed.
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(user)) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

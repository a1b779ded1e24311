use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Multipart framing on top of the file itself
    let upload_limit = usize::try_from(state.config.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024);

    let attachments: Router<Arc<AppState>> = Router::new()
        .route(
            "/add-for/:app_label/:model/:pk/",
            post(handlers::add_attachment).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/delete/:attachment_id/", post(handlers::delete_attachment))
        .route("/for/:app_label/:model/:pk/", get(handlers::list_attachments))
        .route("/files/:attachment_id/:filename", get(handlers::serve_file));

    let prefix = state.urls.prefix().to_string();
    let mut router: Router<Arc<AppState>> = if prefix.is_empty() {
        Router::new().merge(attachments)
    } else {
        Router::new().nest(&prefix, attachments)
    };

    router = router
        // Host integration
        .route(
            "/_internal/owners/:app_label/:model/:pk",
            put(handlers::put_owner).delete(handlers::delete_owner),
        )
        .route(
            "/_internal/users/:user_id/permissions",
            get(handlers::get_permissions).put(handlers::set_permissions),
        )
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state_with;

    #[test]
    fn test_router_accepts_largest_upload_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state_with(&dir, |config| config.max_upload_size = u64::MAX);
        let _router = create_router(state);
    }
}

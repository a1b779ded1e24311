//! attachments - file attachments for arbitrary records
//!
//! This crate lets any record of a host application carry uploaded files:
//! - Polymorphic owner references (`app.model` + identifier) resolved through a registry
//! - Attachment metadata in redb (ACID, MVCC, crash-safe), file bytes in an object store
//! - Permission-gated upload forms and delete links
//! - Template directives that bind forms and attachment lists into a render context
//! - REST routes for uploading and deleting attachments

pub mod api;
pub mod config;
pub mod object_store;
pub mod operations;
pub mod owner;
pub mod permissions;
pub mod resolution;
pub mod storage;
pub mod template;
#[cfg(test)]
pub mod testutil;
pub mod views;

use std::sync::Arc;

use config::Config;
use owner::OwnerRegistry;
use permissions::PermissionChecker;
use storage::Database;
use template::{Library, RenderEnv};
use views::UrlScheme;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub registry: Arc<OwnerRegistry>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub urls: UrlScheme,
}

impl AppState {
    /// State with record-table owners for each configured type tag and the
    /// database's permission grants.
    pub fn new(
        config: Config,
        db: Database,
        object_store: Arc<dyn object_store::ObjectStore>,
    ) -> Self {
        let registry = OwnerRegistry::with_record_tables(&db, &config.owner_types);
        let urls = UrlScheme::new(&config.routing.url_prefix);
        Self {
            permissions: Arc::new(db.clone()),
            registry: Arc::new(registry),
            urls,
            config,
            db,
            object_store,
        }
    }

    pub fn render_env(&self) -> RenderEnv<'_> {
        RenderEnv {
            db: &self.db,
            registry: &self.registry,
            permissions: self.permissions.as_ref(),
            urls: &self.urls,
        }
    }

    pub fn template_library(&self) -> Library {
        Library::new(Arc::clone(&self.registry))
    }
}

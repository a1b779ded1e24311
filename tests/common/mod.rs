//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use attachments::config::{Config, NodeConfig, RoutingConfig, StorageConfig};
use attachments::object_store::LocalStore;
use attachments::owner::OwnerReference;
use attachments::permissions::Permission;
use attachments::storage::Database;
use attachments::AppState;

pub const MAX_UPLOAD_SIZE: u64 = 64 * 1024;

/// State over a temporary directory with `blog.post` and `library.book` owners.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
        },
        routing: RoutingConfig::default(),
        owner_types: vec!["blog.post".parse().unwrap(), "library.book".parse().unwrap()],
        test_mode: true,
        max_upload_size: MAX_UPLOAD_SIZE,
    };

    let db = Database::open(&data_dir).unwrap();
    let object_store = LocalStore::new(&files_dir).unwrap();
    Arc::new(AppState::new(config, db, Arc::new(object_store)))
}

pub fn post(pk: u64) -> OwnerReference {
    OwnerReference::new("blog.post".parse().unwrap(), pk.to_string())
}

/// Register `blog.post` `pk` as live, with canonical URL `/posts/<pk>/`.
pub fn live_post(state: &AppState, pk: u64) -> OwnerReference {
    let owner = post(pk);
    state
        .db
        .put_owner_record(&owner, Some(&format!("/posts/{pk}/")))
        .unwrap();
    owner
}

pub fn grant(state: &AppState, user_id: &str, permissions: &[Permission]) {
    let names: Vec<String> = permissions.iter().map(|p| p.as_str().to_string()).collect();
    state.db.set_user_permissions(user_id, &names).unwrap();
}

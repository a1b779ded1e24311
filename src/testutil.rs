//! Shared test helpers for attachments unit tests.

use std::sync::Arc;

use crate::config::{Config, NodeConfig, RoutingConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::owner::OwnerReference;
use crate::permissions::Permission;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
///
/// `blog.post` and `library.book` are registered owner types.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with(temp_dir, |_| {})
}

/// Like [`test_state`], with the config adjusted before the state is built.
pub fn test_state_with(
    temp_dir: &tempfile::TempDir,
    adjust: impl FnOnce(&mut Config),
) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let mut config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
        },
        routing: RoutingConfig::default(),
        owner_types: vec![
            "blog.post".parse().expect("valid type tag"),
            "library.book".parse().expect("valid type tag"),
        ],
        test_mode: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    adjust(&mut config);

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir).expect("Failed to create test object store");

    Arc::new(AppState::new(config, db, Arc::new(object_store)))
}

/// Register a live `blog.post` record and return its reference.
pub fn live_post(state: &AppState, pk: u64) -> OwnerReference {
    let owner = OwnerReference::new("blog.post".parse().expect("valid type tag"), pk.to_string());
    state
        .db
        .put_owner_record(&owner, Some(&format!("/posts/{pk}/")))
        .expect("Failed to register owner");
    owner
}

pub fn grant(state: &AppState, user_id: &str, permissions: &[Permission]) {
    let names: Vec<String> = permissions.iter().map(|p| p.as_str().to_string()).collect();
    state
        .db
        .set_user_permissions(user_id, &names)
        .expect("Failed to store grants");
}

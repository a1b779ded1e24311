use thiserror::Error;

use crate::owner::TypeTag;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
    /// Record kinds attachments can belong to.
    pub owner_types: Vec<TypeTag>,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for the local object store
    pub local_storage_path: String,
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Mount point of the attachment routes; empty mounts them at the root.
    pub url_prefix: String,
    /// Request header carrying the authenticated user id, set by the gateway.
    pub user_header: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_storage_path: "./files".to_string(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            url_prefix: "/attachments".to_string(),
            user_header: "x-user-id".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let url_prefix = std::env::var("URL_PREFIX")
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "/attachments".to_string());

        let user_header = std::env::var("USER_HEADER")
            .map(|h| h.trim().to_lowercase())
            .unwrap_or_else(|_| "x-user-id".to_string());

        let owner_types = std::env::var("OWNER_TYPES")
            .map(|types| parse_owner_types(&types))
            .unwrap_or_else(|_| Ok(Vec::new()))?;

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig { local_storage_path },
            routing: RoutingConfig {
                url_prefix,
                user_header,
            },
            owner_types,
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.routing.url_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "URL_PREFIX must start with '/', got '{prefix}'"
            )));
        }

        if self.routing.user_header.is_empty() {
            return Err(ConfigError::ValidationError(
                "USER_HEADER cannot be empty".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.owner_types.is_empty() {
            tracing::warn!("OWNER_TYPES is empty. No record can receive attachments.");
        }

        Ok(())
    }
}

/// Parse a comma-separated list of `app.model` tags.
pub fn parse_owner_types(list: &str) -> Result<Vec<TypeTag>, ConfigError> {
    let mut tags: Vec<TypeTag> = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let tag = item
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("OWNER_TYPES: {e}")))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

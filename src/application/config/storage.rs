use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for uploaded files (avatars)
    pub storage_dir: PathBuf,
    /// Public URL prefix used when returning stored file locations
    pub public_url: String,
    pub max_avatar_bytes: usize,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            storage_dir: PathBuf::from(
                env::var("STUDENTLINK_STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string()),
            ),
            public_url: env::var("STUDENTLINK_STORAGE_URL")
                .unwrap_or_else(|_| "/storage".to_string()),
            max_avatar_bytes: 2 * 1024 * 1024,
        }
    }
}

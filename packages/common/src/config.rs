use std::path::PathBuf;

use serde::Deserialize;

/// Image storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Directory blobs are stored under (the public web root). Default: "./public".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Public base URL that `root` is served from. Default: "http://localhost:3000".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Leading path segments for every image path. Default: "uploads/images".
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    /// Largest accepted image in bytes. Default: 50 MB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Lowercase file extensions accepted for uploads.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./public")
}
fn default_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_path_prefix() -> String {
    "uploads/images".into()
}
fn default_max_blob_size() -> u64 {
    50 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff", "ico"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl StorageAppConfig {
    /// Public URL for a storage-relative path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Whether `extension` (without the dot, any case) may be uploaded.
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            base_url: default_base_url(),
            path_prefix: default_path_prefix(),
            max_blob_size: default_max_blob_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::path::BlobPath;
use super::traits::{BlobStore, BoxReader};

/// Directory under the root that holds in-flight writes.
const TEMP_DIR: &str = ".tmp";

/// Filesystem-backed blob store.
///
/// A blob at `a/b/c.png` lives at `{base_path}/a/b/c.png`. Every write lands in
/// `{base_path}/.tmp` first and is then moved into place, so an interrupted
/// write never leaves partial content at a blob path.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TEMP_DIR)).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Compute the filesystem path for a blob.
    fn blob_path(&self, path: &BlobPath) -> Result<PathBuf, StorageError> {
        if path.as_str() == TEMP_DIR || path.as_str().starts_with(".tmp/") {
            return Err(StorageError::InvalidPath(format!(
                "'{TEMP_DIR}' is reserved for in-flight writes"
            )));
        }
        Ok(self.base_path.join(path.to_relative_path_buf()))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TEMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn check_size(&self, actual: u64) -> Result<(), StorageError> {
        if actual > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual,
                limit: self.max_size,
            });
        }
        Ok(())
    }

    /// Copy `reader` into a fresh temp file and flush it to disk.
    ///
    /// The temp file is removed again if anything fails.
    async fn write_temp(&self, mut reader: BoxReader) -> Result<PathBuf, StorageError> {
        let temp_path = self.temp_path();
        let result = async {
            let mut temp_file = fs::File::create(&temp_path).await?;
            let mut total_bytes: u64 = 0;
            let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer

            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                total_bytes += n as u64;
                self.check_size(total_bytes)?;
                temp_file.write_all(&buf[..n]).await?;
            }

            temp_file.flush().await?;
            temp_file.sync_all().await?;
            Ok::<_, StorageError>(())
        }
        .await;

        match result {
            Ok(()) => Ok(temp_path),
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn ensure_parent(target: &Path) -> Result<(), StorageError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError> {
        self.check_size(data.len() as u64)?;
        let reader: BoxReader = Box::new(std::io::Cursor::new(data.to_vec()));
        self.write_stream(path, reader).await
    }

    async fn write_stream(&self, path: &BlobPath, reader: BoxReader) -> Result<(), StorageError> {
        let target = self.blob_path(path)?;
        let temp_path = self.write_temp(reader).await?;

        let moved = async {
            Self::ensure_parent(&target).await?;
            fs::rename(&temp_path, &target).await?;
            Ok::<_, StorageError>(())
        }
        .await;

        if let Err(e) = moved {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(path = %path, "blob written");
        Ok(())
    }

    async fn create(&self, path: &BlobPath, data: &[u8]) -> Result<bool, StorageError> {
        self.check_size(data.len() as u64)?;
        let target = self.blob_path(path)?;

        if fs::try_exists(&target).await? {
            return Ok(false);
        }

        let reader: BoxReader = Box::new(std::io::Cursor::new(data.to_vec()));
        let temp_path = self.write_temp(reader).await?;

        // A hard link fails with `AlreadyExists` instead of replacing, which
        // makes the final step an atomic create-if-absent.
        let linked = async {
            Self::ensure_parent(&target).await?;
            match fs::hard_link(&temp_path, &target).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(StorageError::from(e)),
            }
        }
        .await;

        let _ = fs::remove_file(&temp_path).await;

        if let Ok(true) = linked {
            debug!(path = %path, "blob created");
        }
        linked
    }

    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError> {
        let target = self.blob_path(path)?;
        match fs::File::open(&target).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        let target = self.blob_path(path)?;
        Ok(fs::try_exists(&target).await?)
    }

    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError> {
        let target = self.blob_path(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path = %path, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &BlobPath) -> Result<u64, StorageError> {
        let target = self.blob_path(path)?;
        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::path::BlobPath;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, replacing any existing blob.
    async fn write(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write_stream(path, reader).await
    }

    /// Store data from an async reader at `path`, replacing any existing blob.
    async fn write_stream(&self, path: &BlobPath, reader: BoxReader) -> Result<(), StorageError>;

    /// Store bytes at `path` only if nothing is stored there yet.
    ///
    /// Returns `false` without touching storage when the path is taken.
    async fn create(&self, path: &BlobPath, data: &[u8]) -> Result<bool, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn read(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, path: &BlobPath) -> Result<u64, StorageError>;
}

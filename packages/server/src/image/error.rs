use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

use super::path::PathError;

/// Errors returned by [`ImageService`](super::ImageService) operations.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Rejected input: bad filename, empty or oversized content, unsupported extension.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The image record, or the blob behind it, does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Io(StorageError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DbErr),
}

impl ImageError {
    pub(crate) fn image_not_found(id: i32) -> Self {
        Self::NotFound(format!("Image {id} not found"))
    }

    pub(crate) fn path_exhausted(filename: &str) -> Self {
        Self::Io(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free storage path for '{filename}'"),
        )))
    }
}

impl From<StorageError> for ImageError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => Self::NotFound(format!("Image file not found: {path}")),
            StorageError::SizeLimitExceeded { limit, .. } => {
                Self::Validation(format!("Image exceeds maximum size of {limit} bytes"))
            }
            other => Self::Io(other),
        }
    }
}

impl From<PathError> for ImageError {
    fn from(err: PathError) -> Self {
        Self::Validation(err.message().into())
    }
}

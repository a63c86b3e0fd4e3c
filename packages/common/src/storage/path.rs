use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

const MAX_PATH_LEN: usize = 1024;

/// A validated, storage-relative blob path such as
/// `uploads/images/gallery/2026-10-Oct/photo.png`.
///
/// Segments are separated by `/`. The path is never absolute, never contains
/// empty, `.` or `..` segments, and never contains backslashes or null bytes,
/// so joining it onto a storage root cannot escape that root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobPath(String);

impl BlobPath {
    /// Parse and validate a relative path.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidPath("path cannot be empty".into()));
        }
        if s.len() > MAX_PATH_LEN {
            return Err(StorageError::InvalidPath(format!(
                "path exceeds maximum length of {MAX_PATH_LEN} bytes"
            )));
        }
        if s.contains('\0') {
            return Err(StorageError::InvalidPath(
                "path must not contain null bytes".into(),
            ));
        }
        if s.contains('\\') {
            return Err(StorageError::InvalidPath(
                "path must not contain backslashes".into(),
            ));
        }
        if s.starts_with('/') {
            return Err(StorageError::InvalidPath(
                "path must be relative to the storage root".into(),
            ));
        }

        for segment in s.split('/') {
            match segment {
                "" => {
                    return Err(StorageError::InvalidPath(
                        "path must not contain empty segments".into(),
                    ));
                }
                "." | ".." => {
                    return Err(StorageError::InvalidPath(format!(
                        "path must not contain '{segment}' segments"
                    )));
                }
                _ => {}
            }
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Convert into a native path relative to a storage root.
    pub fn to_relative_path_buf(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Debug for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobPath({})", self.0)
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for BlobPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

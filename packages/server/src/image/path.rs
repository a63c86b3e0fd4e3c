use chrono::{DateTime, Utc};
use common::ImageType;
use common::storage::{BlobPath, BlobStore, StorageError};

use super::error::ImageError;
use super::repository::ImageRecordRepository;

/// Upper bound on `-N` suffixes tried before giving up on a filename.
pub const MAX_RESOLVE_ATTEMPTS: u32 = 64;

/// Reasons a client-supplied filename cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains `..`.
    PathTraversal,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename starts with a drive-letter marker such as `C:`.
    AbsolutePath,
    /// Filename contains null bytes.
    NullByte,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// The sanitized filename does not form a valid storage path.
    Unrepresentable,
}

impl PathError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::AbsolutePath => "Invalid filename: absolute paths are not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::Unrepresentable => "Invalid filename: cannot be stored",
        }
    }
}

/// Validates an uploaded filename and returns it trimmed.
pub fn validate_filename(filename: &str) -> Result<&str, PathError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    if trimmed.contains('\0') {
        return Err(PathError::NullByte);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(PathError::ControlCharacter);
    }
    if trimmed.contains("..") {
        return Err(PathError::PathTraversal);
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(PathError::ContainsPathSeparator);
    }
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(PathError::AbsolutePath);
    }
    if trimmed.starts_with('.') {
        return Err(PathError::Hidden);
    }

    Ok(trimmed)
}

/// Returns the lowercase extension of a filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Replace characters outside `[A-Za-z0-9._-]` with `-`.
fn sanitize_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(|c| c == '-' || c == '.').to_string()
}

/// Split a validated filename into a sanitized stem and lowercase extension.
fn storage_name(filename: &str) -> (String, Option<String>) {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    let mut stem = sanitize_segment(stem);
    if stem.is_empty() {
        stem = "image".into();
    }
    let ext = ext.map(sanitize_segment).filter(|e| !e.is_empty());
    (stem, ext.map(|e| e.to_ascii_lowercase()))
}

/// Derives storage paths of the form `{prefix}/{type}/{YYYY-MM-Mon}/{file}`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    prefix: String,
}

impl PathResolver {
    /// Create a resolver rooted at `prefix` (e.g. `uploads/images`).
    pub fn new(prefix: &str) -> Result<Self, StorageError> {
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            BlobPath::parse(prefix)?;
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    /// Time bucket an upload at `at` is filed under, e.g. `2026-10-Oct`.
    pub fn bucket(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%b").to_string()
    }

    /// Path for attempt `attempt` at storing `filename`; attempt 0 is the bare name,
    /// later attempts add a `-N` suffix before the extension.
    pub fn candidate(
        &self,
        image_type: ImageType,
        filename: &str,
        at: DateTime<Utc>,
        attempt: u32,
    ) -> Result<BlobPath, PathError> {
        let filename = validate_filename(filename)?;
        let (stem, ext) = storage_name(filename);

        let file = match (attempt, ext) {
            (0, Some(ext)) => format!("{stem}.{ext}"),
            (0, None) => stem,
            (n, Some(ext)) => format!("{stem}-{n}.{ext}"),
            (n, None) => format!("{stem}-{n}"),
        };

        let mut path = String::new();
        if !self.prefix.is_empty() {
            path.push_str(&self.prefix);
            path.push('/');
        }
        path.push_str(image_type.as_str());
        path.push('/');
        path.push_str(&Self::bucket(at));
        path.push('/');
        path.push_str(&file);

        BlobPath::parse(&path).map_err(|_| PathError::Unrepresentable)
    }

    /// First candidate path not already used by a blob or an image record.
    ///
    /// The result is only a snapshot: callers must still claim it with
    /// [`BlobStore::create`], which fails if another request got there first.
    pub async fn resolve(
        &self,
        image_type: ImageType,
        filename: &str,
        at: DateTime<Utc>,
        store: &dyn BlobStore,
        records: &dyn ImageRecordRepository,
    ) -> Result<BlobPath, ImageError> {
        for attempt in 0..MAX_RESOLVE_ATTEMPTS {
            let path = self.candidate(image_type, filename, at, attempt)?;
            if store.exists(&path).await? {
                continue;
            }
            if records.path_exists(path.as_str()).await? {
                continue;
            }
            return Ok(path);
        }

        Err(ImageError::path_exhausted(filename))
    }
}

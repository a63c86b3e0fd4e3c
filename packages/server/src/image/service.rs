use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use common::ImageType;
use common::StorageAppConfig;
use common::storage::{BlobPath, BlobStore, BoxReader};
use tracing::{error, info, warn};

use super::error::ImageError;
use super::path::{MAX_RESOLVE_ATTEMPTS, PathResolver, extension_of, validate_filename};
use super::repository::{ImageFilter, ImageRecordRepository, ImageUpdate, NewImageRecord};
use crate::entity::image;

/// An image upload as received from a caller.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub data: &'a [u8],
    pub filename: &'a str,
    pub image_type: ImageType,
    /// Owning content unit, `0` for none.
    pub uploaded_to: i32,
    /// Acting principal.
    pub actor: i32,
}

/// Coordinates blob storage and image records.
///
/// Blobs are always written before their record is created and deleted
/// before their record is removed, so a record never points at a blob that
/// was never written.
pub struct ImageService {
    store: Arc<dyn BlobStore>,
    records: Arc<dyn ImageRecordRepository>,
    resolver: PathResolver,
    config: StorageAppConfig,
}

impl ImageService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        records: Arc<dyn ImageRecordRepository>,
        config: StorageAppConfig,
    ) -> Result<Self, ImageError> {
        let resolver = PathResolver::new(&config.path_prefix)?;
        Ok(Self {
            store,
            records,
            resolver,
            config,
        })
    }

    pub fn config(&self) -> &StorageAppConfig {
        &self.config
    }

    /// Store a new image and create its record.
    pub async fn upload(&self, request: UploadRequest<'_>) -> Result<image::Model, ImageError> {
        let filename = validate_filename(request.filename)?;
        if request.data.is_empty() {
            return Err(ImageError::Validation("Image content cannot be empty".into()));
        }
        match extension_of(filename) {
            Some(ext) if self.config.is_allowed_extension(&ext) => {}
            _ => {
                return Err(ImageError::Validation(format!(
                    "Unsupported image file type (allowed: {})",
                    self.config.allowed_extensions.join(", ")
                )));
            }
        }
        if request.data.len() as u64 > self.config.max_blob_size {
            return Err(ImageError::Validation(format!(
                "Image exceeds maximum size of {} bytes",
                self.config.max_blob_size
            )));
        }

        let path = self
            .claim_path(request.image_type, filename, request.data)
            .await?;

        let new_record = NewImageRecord {
            name: filename.to_string(),
            url: self.config.url_for(path.as_str()),
            path: path.to_string(),
            image_type: request.image_type,
            uploaded_to: request.uploaded_to,
            actor: request.actor,
        };

        match self.records.create(new_record).await {
            Ok(record) => {
                info!(
                    image_id = record.id,
                    path = %path,
                    image_type = %record.image_type,
                    size = request.data.len(),
                    "Image uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&path).await {
                    error!(path = %path, error = %cleanup, "Failed to remove blob after record creation failed");
                }
                Err(e.into())
            }
        }
    }

    /// Resolve a free path and write `data` there.
    ///
    /// A lost race against a concurrent upload of the same name resolves again;
    /// the winner's blob then makes the resolver move on to the next suffix.
    async fn claim_path(
        &self,
        image_type: ImageType,
        filename: &str,
        data: &[u8],
    ) -> Result<BlobPath, ImageError> {
        let now = Utc::now();
        for _ in 0..MAX_RESOLVE_ATTEMPTS {
            let path = self
                .resolver
                .resolve(
                    image_type,
                    filename,
                    now,
                    self.store.as_ref(),
                    self.records.as_ref(),
                )
                .await?;
            if self.store.create(&path, data).await? {
                return Ok(path);
            }
            warn!(path = %path, "Lost race for image path, resolving again");
        }

        Err(ImageError::path_exhausted(filename))
    }

    /// Decode a base64 payload and store it as a new image.
    ///
    /// The filename is generated as `{stem}-{actor}-{unix time}.png`.
    pub async fn upload_base64(
        &self,
        payload: &str,
        image_type: ImageType,
        uploaded_to: i32,
        actor: i32,
    ) -> Result<image::Model, ImageError> {
        let data = decode_base64_image(payload)?;
        let filename = format!(
            "{}-{}-{}.png",
            image_type.generated_stem(),
            actor,
            Utc::now().timestamp()
        );

        self.upload(UploadRequest {
            data: &data,
            filename: &filename,
            image_type,
            uploaded_to,
            actor,
        })
        .await
    }

    /// Replace the content of an existing drawing in place.
    ///
    /// The record keeps its id and path; only the blob bytes and the
    /// `updated_by`/`updated_at` stamps change.
    pub async fn replace_drawing(
        &self,
        id: i32,
        payload: &str,
        actor: i32,
    ) -> Result<image::Model, ImageError> {
        let existing = self.require(id).await?;
        if existing.image_type != ImageType::Drawio {
            return Err(ImageError::Validation(format!(
                "Image {id} is not a drawing"
            )));
        }
        let data = decode_base64_image(payload)?;
        let path = BlobPath::parse(&existing.path)?;

        self.store.write(&path, &data).await?;

        let update = ImageUpdate {
            name: None,
            updated_by: actor,
        };
        let Some(updated) = self.records.update(id, update).await? else {
            // Deleted concurrently: the write above re-created a blob nothing points at.
            if let Err(cleanup) = self.store.delete(&path).await {
                error!(image_id = id, path = %path, error = %cleanup, "Failed to remove blob of deleted drawing");
            }
            return Err(ImageError::image_not_found(id));
        };

        info!(image_id = id, path = %path, size = data.len(), "Drawing replaced");
        Ok(updated)
    }

    /// Delete an image's blob and then its record.
    ///
    /// If the blob cannot be removed the record is left untouched.
    pub async fn delete(&self, id: i32) -> Result<(), ImageError> {
        let existing = self.require(id).await?;
        let path = BlobPath::parse(&existing.path)?;

        if !self.store.delete(&path).await? {
            warn!(image_id = id, path = %path, "Image blob already missing at delete");
        }
        self.records.delete(id).await?;

        info!(image_id = id, path = %path, "Image deleted");
        Ok(())
    }

    /// Image content encoded as standard base64.
    pub async fn get_base64(&self, id: i32) -> Result<String, ImageError> {
        let existing = self.require(id).await?;
        let path = BlobPath::parse(&existing.path)?;
        let data = self.store.read(&path).await?;
        Ok(STANDARD.encode(data))
    }

    pub async fn get(&self, id: i32) -> Result<image::Model, ImageError> {
        self.require(id).await
    }

    /// Record and streaming reader for an image's content.
    pub async fn open_content(
        &self,
        id: i32,
    ) -> Result<(image::Model, u64, BoxReader), ImageError> {
        let existing = self.require(id).await?;
        let path = BlobPath::parse(&existing.path)?;
        let size = self.store.size(&path).await?;
        let reader = self.store.read_stream(&path).await?;
        Ok((existing, size, reader))
    }

    /// Change an image's display name. The stored path is not affected.
    pub async fn rename(&self, id: i32, name: &str, actor: i32) -> Result<image::Model, ImageError> {
        let name = validate_filename(name)?;
        self.records
            .update(
                id,
                ImageUpdate {
                    name: Some(name.to_string()),
                    updated_by: actor,
                },
            )
            .await?
            .ok_or_else(|| ImageError::image_not_found(id))
    }

    pub async fn list(
        &self,
        filter: &ImageFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<image::Model>, u64), ImageError> {
        let in_range = page
            .saturating_sub(1)
            .checked_mul(per_page)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(ImageError::Validation(format!(
                "Page {page} is out of range"
            )));
        }
        Ok(self.records.list(filter, page, per_page).await?)
    }

    async fn require(&self, id: i32) -> Result<image::Model, ImageError> {
        self.records
            .find_by_id(id)
            .await?
            .ok_or_else(|| ImageError::image_not_found(id))
    }
}

/// Decode a base64 image, ignoring a leading `<mime>;base64,` or
/// `data:<mime>;base64,` prefix and surrounding whitespace.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>, ImageError> {
    let encoded = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    let encoded = encoded.trim();

    let data = STANDARD.decode(encoded)?;
    if data.is_empty() {
        return Err(ImageError::Validation("Image content cannot be empty".into()));
    }
    Ok(data)
}

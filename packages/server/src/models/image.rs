use chrono::{DateTime, Utc};
use common::ImageType;
use serde::{Deserialize, Serialize};

use crate::entity::image;

use super::shared::Pagination;

/// Response DTO for a single image record.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImageResponse {
    #[schema(example = 1)]
    pub id: i32,
    /// Display name.
    #[schema(example = "first-image.png")]
    pub name: String,
    /// Public URL of the image content.
    #[schema(example = "http://localhost:3000/uploads/images/gallery/2026-10-Oct/first-image.png")]
    pub url: String,
    /// Storage path relative to the storage root.
    #[schema(example = "uploads/images/gallery/2026-10-Oct/first-image.png")]
    pub path: String,
    #[serde(rename = "type")]
    #[schema(example = "gallery")]
    pub image_type: ImageType,
    /// Owning content unit, `0` for none.
    #[schema(example = 0)]
    pub uploaded_to: i32,
    #[schema(example = 1)]
    pub created_by: i32,
    #[schema(example = 1)]
    pub updated_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<image::Model> for ImageResponse {
    fn from(model: image::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            path: model.path,
            image_type: model.image_type,
            uploaded_to: model.uploaded_to,
            created_by: model.created_by,
            updated_by: model.updated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for listing images.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListImagesParams {
    /// Filter by image type.
    #[serde(rename = "type")]
    #[param(example = "gallery")]
    pub image_type: Option<ImageType>,
    /// Filter by owning content unit.
    #[param(example = 42)]
    pub uploaded_to: Option<i32>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

/// Response DTO for listing images.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageListResponse {
    pub data: Vec<ImageResponse>,
    pub pagination: Pagination,
}

/// Request body for creating a drawing from base64 data.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DrawingUploadRequest {
    /// Owning content unit, `0` for none.
    #[serde(default)]
    #[schema(example = 0)]
    pub uploaded_to: i32,
    /// Base64 image data, optionally prefixed with `data:<mime>;base64,`.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image: String,
}

/// Request body for replacing a drawing's content.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DrawingReplaceRequest {
    /// Base64 image data, optionally prefixed with `data:<mime>;base64,`.
    #[schema(example = "iVBORw0KGgo...")]
    pub image: String,
}

/// Request body for renaming an image.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RenameImageRequest {
    #[schema(example = "holiday.png")]
    pub name: String,
}

/// Base64-encoded image content.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Base64Response {
    #[schema(example = "iVBORw0KGgo...")]
    pub content: String,
}

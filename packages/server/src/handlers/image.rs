use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::ImageType;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::image::{ImageFilter, UploadRequest};
use crate::models::image::{
    Base64Response, DrawingReplaceRequest, DrawingUploadRequest, ImageListResponse,
    ImageResponse, ListImagesParams, RenameImageRequest,
};
use crate::models::shared::{Pagination, page_bounds};
use crate::state::AppState;

/// Room for multipart framing and text fields on top of the blob itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Body limit for upload routes. Base64 inflates payloads by a third.
pub fn image_upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let max = usize::try_from(max_blob_size.saturating_mul(4) / 3).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max.saturating_add(MULTIPART_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/gallery/upload",
    tag = "Images",
    operation_id = "uploadGalleryImage",
    summary = "Upload a gallery image",
    description = "Stores the `file` multipart field as a gallery image. An optional \
        `uploaded_to` field links it to a content unit (defaults to 0). Name collisions \
        within the same month are resolved with a numeric suffix.",
    request_body(content_type = "multipart/form-data", description = "Image file with optional owner"),
    responses(
        (status = 201, description = "Image created", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_gallery_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut uploaded_to = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some((filename, data.to_vec()));
            }
            Some("uploaded_to") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read uploaded_to: {e}"))
                })?;
                uploaded_to = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Validation("uploaded_to must be an integer".into()))?;
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let image = state
        .images
        .upload(UploadRequest {
            data: &data,
            filename: &filename,
            image_type: ImageType::Gallery,
            uploaded_to,
            actor: auth_user.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ImageResponse::from(image))))
}

#[utoipa::path(
    post,
    path = "/drawing/upload",
    tag = "Images",
    operation_id = "uploadDrawing",
    summary = "Upload a drawing from base64 data",
    description = "Decodes `image` and stores it as a new drawio image named \
        `drawing-{user}-{timestamp}.png`.",
    request_body = DrawingUploadRequest,
    responses(
        (status = 201, description = "Drawing created", body = ImageResponse),
        (status = 400, description = "Validation or decode error (VALIDATION_ERROR, DECODE_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn upload_drawing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<DrawingUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let image = state
        .images
        .upload_base64(
            &payload.image,
            ImageType::Drawio,
            payload.uploaded_to,
            auth_user.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ImageResponse::from(image))))
}

#[utoipa::path(
    put,
    path = "/drawing/upload/{id}",
    tag = "Images",
    operation_id = "replaceDrawing",
    summary = "Replace a drawing's content",
    description = "Overwrites the stored bytes of an existing drawio image. \
        The id, path and URL stay the same.",
    params(("id" = i32, Path, description = "Image ID")),
    request_body = DrawingReplaceRequest,
    responses(
        (status = 200, description = "Drawing replaced", body = ImageResponse),
        (status = 400, description = "Validation or decode error (VALIDATION_ERROR, DECODE_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn replace_drawing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<DrawingReplaceRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    let image = state
        .images
        .replace_drawing(id, &payload.image, auth_user.user_id)
        .await?;

    Ok(Json(image.into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Images",
    operation_id = "listImages",
    summary = "List images",
    description = "Returns image records newest first, optionally filtered by type and owner.",
    params(ListImagesParams),
    responses(
        (status = 200, description = "Paginated image list", body = ImageListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_images(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListImagesParams>,
) -> Result<Json<ImageListResponse>, AppError> {
    let (page, per_page) = page_bounds(params.page, params.per_page);
    let filter = ImageFilter {
        image_type: params.image_type,
        uploaded_to: params.uploaded_to,
    };

    let (images, total) = state.images.list(&filter, page, per_page).await?;

    Ok(Json(ImageListResponse {
        data: images.into_iter().map(ImageResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Get an image record",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image record", body = ImageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_image(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ImageResponse>, AppError> {
    Ok(Json(state.images.get(id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Images",
    operation_id = "renameImage",
    summary = "Rename an image",
    description = "Changes the display name only. The stored file and URL are untouched.",
    params(("id" = i32, Path, description = "Image ID")),
    request_body = RenameImageRequest,
    responses(
        (status = 200, description = "Image renamed", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn rename_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RenameImageRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    let image = state
        .images
        .rename(id, &payload.name, auth_user.user_id)
        .await?;

    Ok(Json(image.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Removes the stored file and then the record. If the file cannot be \
        removed the record is kept.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.images.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/base64/{id}",
    tag = "Images",
    operation_id = "getImageBase64",
    summary = "Get image content as base64",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Base64 content", body = Base64Response),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image or file not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_image_base64(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Base64Response>, AppError> {
    let content = state.images.get_base64(id).await?;
    Ok(Json(Base64Response { content }))
}

#[utoipa::path(
    get,
    path = "/{id}/content",
    tag = "Images",
    operation_id = "getImageContent",
    summary = "Download image content",
    description = "Streams the stored bytes. `Content-Type` is guessed from the stored path.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Image or file not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_image_content(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let (image, size, reader) = state.images.open_content(id).await?;

    let content_type = mime_guess::from_path(&image.path).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}


//! Image uploads: path resolution, metadata records and the service that
//! keeps blobs and records consistent with each other.

mod error;
mod path;
mod repository;
mod service;

pub use error::ImageError;
pub use path::{MAX_RESOLVE_ATTEMPTS, PathError, PathResolver, extension_of, validate_filename};
pub use repository::{
    ImageFilter, ImageRecordRepository, ImageUpdate, NewImageRecord, SeaOrmImageRepository,
};
pub use service::{ImageService, UploadRequest, decode_base64_image};

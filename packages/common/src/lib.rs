pub mod config;
pub mod image_type;
pub mod storage;

pub use config::StorageAppConfig;
pub use image_type::ImageType;

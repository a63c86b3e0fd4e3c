mod error;
mod path;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use path::BlobPath;
pub use traits::{BlobStore, BoxReader};

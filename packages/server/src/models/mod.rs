pub mod image;
pub mod shared;

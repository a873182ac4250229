pub mod errors;

pub use errors::ThumbnailError;

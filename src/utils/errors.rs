use std::time::Duration;
use thiserror::Error;

/// Failure to produce one item's preview. Contained within the thumbnail
/// pipeline; it only ever marks that single item as failed.
#[derive(Error, Debug, Clone)]
pub enum ThumbnailError {
    #[error("Thumbnail generation failed: {0}")]
    Generation(String),

    #[error("Thumbnail generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ThumbnailError {
    fn from(error: std::io::Error) -> Self {
        ThumbnailError::Io(error.to_string())
    }
}

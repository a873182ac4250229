pub mod thumbnailer;

pub use thumbnailer::{
    FfmpegThumbnailGenerator, ThumbnailGenerator, ThumbnailOptions, ThumbnailRequest,
};

/// Background tasks that drive state on behalf of a view
pub mod grid_sync;
pub mod slideshow_controller;
pub mod thumbnail_pipeline;

pub use grid_sync::{GridSync, GridSyncHandle};
pub use slideshow_controller::{SlideshowController, SlideshowInput, SlideshowSettings};
pub use thumbnail_pipeline::{PipelineSettings, ThumbnailPipeline};

//! Keeps the thumbnail pipeline and the slideshow in step with the listing
//! a [`BrowserViewModel`] publishes.
//!
//! Each time a new listing is loaded its videos are handed to the pipeline,
//! which restarts only when the ids or their order changed. The slideshow
//! is told the new length so an open viewer clamps or closes.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{SlideshowController, ThumbnailPipeline};
use crate::core::viewmodels::BrowserViewModel;
use crate::models::{MediaCategory, MediaItem};

#[derive(Clone)]
pub struct GridSync {
    vm: BrowserViewModel,
    pipeline: Arc<ThumbnailPipeline>,
    slideshow: Option<Arc<SlideshowController>>,
}

impl GridSync {
    pub fn new(vm: BrowserViewModel, pipeline: Arc<ThumbnailPipeline>) -> Self {
        Self {
            vm,
            pipeline,
            slideshow: None,
        }
    }

    pub fn with_slideshow(mut self, slideshow: Arc<SlideshowController>) -> Self {
        self.slideshow = Some(slideshow);
        self
    }

    /// Push the listing currently published by the view model downstream.
    /// Returns the pipeline generation if a new one was started. Does
    /// nothing while the listing is loading or failed.
    pub fn apply(&self) -> Option<u64> {
        if self.vm.files().loaded().is_none() {
            trace!("Listing not loaded, keeping thumbnails");
            return None;
        }

        let items = self.vm.media_items();
        if let Some(slideshow) = &self.slideshow {
            slideshow.list_changed(items.len());
        }

        let videos: Vec<MediaItem> = items
            .into_iter()
            .filter(|item| MediaCategory::Videos.contains(&item.metadata))
            .collect();
        let count = videos.len();
        let started = self.pipeline.start_if_changed(videos);
        if let Some(generation) = started {
            debug!("Listing changed, thumbnail generation {} for {} videos", generation, count);
        }
        started
    }

    /// Apply the current listing, then every later one, until stopped or
    /// until the view model is disposed.
    pub fn spawn(self) -> GridSyncHandle {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let mut files = self.vm.files_watch();

        let handle = tokio::spawn(async move {
            loop {
                files.borrow_and_update();
                self.apply();

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.vm.disposed() => break,
                    changed = files.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Grid sync stopped");
        });

        GridSyncHandle { handle, stop }
    }
}

/// Stops the spawned sync task when dropped.
pub struct GridSyncHandle {
    handle: JoinHandle<()>,
    stop: CancellationToken,
}

impl GridSyncHandle {
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for GridSyncHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

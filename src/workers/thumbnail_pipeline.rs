//! Per-item preview generation for a list of videos.
//!
//! Every call to [`ThumbnailPipeline::start`] opens a new generation: the
//! list is reset to `Pending`, the previous generation's liveness token is
//! cancelled, and one task per item is spawned. Tasks finish in any order
//! and commit their result by item id. A commit is applied only while the
//! generation that spawned it is still current and alive, so results that
//! arrive after a restart or after [`dispose`](ThumbnailPipeline::dispose)
//! are dropped without touching the published list.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ThumbnailConfig;
use crate::core::viewmodels::{Property, PropertySubscriber};
use crate::models::{FileId, MediaItem, ThumbnailState};
use crate::services::{ThumbnailGenerator, ThumbnailOptions, ThumbnailRequest};
use crate::utils::ThumbnailError;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub options: ThumbnailOptions,
    /// `None` leaves generation calls unbounded in time
    pub timeout: Option<Duration>,
    /// `None` runs every item at once
    pub max_concurrent: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ThumbnailConfig::default())
    }
}

impl From<&ThumbnailConfig> for PipelineSettings {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            options: ThumbnailOptions::from(config),
            timeout: (config.timeout_secs > 0).then(|| config.timeout()),
            max_concurrent: (config.max_concurrent > 0).then_some(config.max_concurrent),
        }
    }
}

#[derive(Debug, Default)]
struct Generation {
    id: u64,
    liveness: Option<CancellationToken>,
}

#[derive(Debug)]
pub struct ThumbnailPipeline {
    generator: Arc<dyn ThumbnailGenerator>,
    settings: PipelineSettings,
    limiter: Option<Arc<Semaphore>>,
    items: Property<Vec<MediaItem>>,
    current: Arc<Mutex<Generation>>,
}

impl ThumbnailPipeline {
    pub fn new(generator: Arc<dyn ThumbnailGenerator>, settings: PipelineSettings) -> Self {
        let limiter = settings
            .max_concurrent
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));
        Self {
            generator,
            settings,
            limiter,
            items: Property::new(Vec::new(), "thumbnail_items"),
            current: Arc::new(Mutex::new(Generation::default())),
        }
    }

    /// Items of the current generation, in input order.
    pub fn items(&self) -> Vec<MediaItem> {
        self.items.get()
    }

    pub fn states(&self) -> Vec<ThumbnailState> {
        self.items
            .with(|items| items.iter().map(|i| i.thumbnail.clone()).collect())
    }

    pub fn subscribe(&self) -> PropertySubscriber {
        self.items.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<MediaItem>> {
        self.items.watch()
    }

    pub fn current_generation(&self) -> u64 {
        lock(&self.current).id
    }

    pub fn is_alive(&self) -> bool {
        lock(&self.current)
            .liveness
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Discard whatever is running and start over on `items`, all reset to
    /// `Pending`. Returns the new generation id.
    pub fn start(&self, items: Vec<MediaItem>) -> u64 {
        let liveness = CancellationToken::new();
        let items: Vec<MediaItem> = items
            .into_iter()
            .map(|mut item| {
                item.thumbnail = ThumbnailState::Pending;
                item
            })
            .collect();
        let requests: Vec<ThumbnailRequest> = items
            .iter()
            .map(|item| ThumbnailRequest {
                id: item.id().clone(),
                source_url: item.source_url.clone(),
                options: self.settings.options,
            })
            .collect();

        let generation = {
            let mut current = lock(&self.current);
            if let Some(previous) = current.liveness.replace(liveness.clone()) {
                previous.cancel();
                debug!("Discarded thumbnail generation {}", current.id);
            }
            current.id += 1;
            // Reset while holding the lock so no commit can interleave
            self.items.set(items);
            current.id
        };

        info!(
            "Starting thumbnail generation {} for {} items",
            generation,
            requests.len()
        );

        for request in requests {
            let task = ItemTask {
                generation,
                liveness: liveness.clone(),
                generator: self.generator.clone(),
                limiter: self.limiter.clone(),
                timeout: self.settings.timeout,
                items: self.items.clone(),
                current: self.current.clone(),
            };
            tokio::spawn(task.run(request));
        }

        generation
    }

    /// Restart only if the ids or their order differ from the current list.
    pub fn start_if_changed(&self, items: Vec<MediaItem>) -> Option<u64> {
        let unchanged = self.items.with(|current| {
            current.len() == items.len()
                && current.iter().zip(&items).all(|(a, b)| a.id() == b.id())
        });
        if unchanged && self.is_alive() {
            trace!("Video list unchanged, keeping generation");
            return None;
        }
        Some(self.start(items))
    }

    /// Invalidate the current generation. Outstanding results are dropped
    /// when they arrive; the published list is left as it is.
    pub fn dispose(&self) {
        let mut current = lock(&self.current);
        if let Some(liveness) = current.liveness.take() {
            liveness.cancel();
            debug!("Disposed thumbnail generation {}", current.id);
        }
    }

    /// Wait until every item of the current generation has settled, or the
    /// generation is replaced or disposed. Returns the items seen last.
    pub async fn settled(&self) -> Vec<MediaItem> {
        let generation = self.current_generation();
        let mut rx = self.items.watch();
        loop {
            // Release the borrow before touching the generation lock
            let items = rx.borrow_and_update().clone();
            if items.iter().all(|i| i.thumbnail.is_settled())
                || self.current_generation() != generation
                || !self.is_alive()
            {
                return items;
            }
            if rx.changed().await.is_err() {
                return self.items();
            }
        }
    }
}

impl Drop for ThumbnailPipeline {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct ItemTask {
    generation: u64,
    liveness: CancellationToken,
    generator: Arc<dyn ThumbnailGenerator>,
    limiter: Option<Arc<Semaphore>>,
    timeout: Option<Duration>,
    items: Property<Vec<MediaItem>>,
    current: Arc<Mutex<Generation>>,
}

impl ItemTask {
    async fn run(self, request: ThumbnailRequest) {
        let _permit = match &self.limiter {
            Some(limiter) => {
                tokio::select! {
                    permit = limiter.clone().acquire_owned() => permit.ok(),
                    _ = self.liveness.cancelled() => {
                        trace!("Generation {} gone before {} started", self.generation, request.id);
                        return;
                    }
                }
            }
            None => None,
        };
        if self.liveness.is_cancelled() {
            return;
        }

        let outcome = self.generate(&request).await;
        let state = match outcome {
            Ok(uri) => ThumbnailState::Ready { uri },
            Err(e) => {
                warn!("Thumbnail for {} failed: {}", request.id, e);
                ThumbnailState::Failed
            }
        };
        self.commit(&request.id, state);
    }

    async fn generate(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(request))
                .await
                .unwrap_or(Err(ThumbnailError::Timeout(limit))),
            None => self.generator.generate(request).await,
        }
    }

    fn commit(&self, id: &FileId, state: ThumbnailState) -> bool {
        let current = lock(&self.current);
        if self.liveness.is_cancelled() || current.id != self.generation {
            debug!(
                "Dropping stale thumbnail result for {} from generation {}",
                id, self.generation
            );
            return false;
        }

        let applied = self.items.update_if(|items| {
            // First still-pending entry with this id; duplicates each get
            // their own task and settle one by one.
            match items
                .iter_mut()
                .find(|item| item.id() == id && item.thumbnail.can_transition_to(&state))
            {
                Some(item) => {
                    item.thumbnail = state;
                    true
                }
                None => false,
            }
        });
        drop(current);

        if applied {
            trace!("Committed thumbnail for {} in generation {}", id, self.generation);
        }
        applied
    }
}

fn lock(current: &Mutex<Generation>) -> MutexGuard<'_, Generation> {
    current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

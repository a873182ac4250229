#![cfg(test)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::backends::FileServer;
use crate::backends::file_server::ApiError;
use crate::core::query::{Condition, RemoteRequest};
use crate::models::{FileMetadata, MediaItem};
use crate::services::{ThumbnailGenerator, ThumbnailRequest};
use crate::utils::ThumbnailError;

/// Three text files, two of them tagged `tag 1`.
pub fn text_files() -> Vec<FileMetadata> {
    vec![
        FileMetadata::new("1", "file 1.txt", "txt"),
        FileMetadata::new("2", "file 2.txt", "txt").with_tags(["tag 1"]),
        FileMetadata::new("3", "file 3.txt", "txt").with_tags(["tag 1", "tag 2"]),
    ]
}

pub fn video_files() -> Vec<FileMetadata> {
    vec![
        FileMetadata::new("1", "file 1.mp4", "mp4"),
        FileMetadata::new("2", "file 2.mp4", "mp4").with_tags(["tag 1"]),
        FileMetadata::new("3", "file 3.mp4", "mp4").with_tags(["tag 1", "tag 2"]),
    ]
}

pub fn media_items(files: &[FileMetadata]) -> Vec<MediaItem> {
    files
        .iter()
        .map(|f| MediaItem::new(f.clone(), format!("http://test/content/{}", f.id)))
        .collect()
}

/// Generator whose per-id delay and outcome are scripted. Ids listed as
/// gated block until [`release`](Self::release) is called.
#[derive(Debug, Default)]
pub struct MockGenerator {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    gated: HashSet<String>,
    gate: Notify,
    released: std::sync::atomic::AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failures.insert(id.to_string());
        self
    }

    pub fn gated(mut self, id: &str) -> Self {
        self.gated.insert(id.to_string());
        self
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThumbnailGenerator for MockGenerator {
    async fn generate(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError> {
        let id = request.id.to_string();
        self.calls.lock().unwrap().push(id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.gated.contains(&id) {
            let notified = self.gate.notified();
            if !self.released.load(Ordering::SeqCst) {
                notified.await;
            }
        }
        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(&id) {
            Err(ThumbnailError::Generation(format!("cannot decode {}", id)))
        } else {
            Ok(format!("file:///thumbs/{}.jpg", id))
        }
    }
}

/// In-memory file server. Conditional queries are answered with AND
/// semantics over the stored files; every executed request is recorded.
#[derive(Debug, Default)]
pub struct MockFileServer {
    pub files: Vec<FileMetadata>,
    pub tags: Vec<String>,
    pub fail_with: Mutex<Option<ApiError>>,
    pub requests: Mutex<Vec<RemoteRequest>>,
    pub delay: Option<Duration>,
}

impl MockFileServer {
    pub fn new(files: Vec<FileMetadata>) -> Self {
        let mut tags: Vec<String> = files.iter().flat_map(|f| f.tags.iter().cloned()).collect();
        tags.sort();
        tags.dedup();
        tags.reverse();
        Self {
            files,
            tags,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, error: ApiError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn request_log(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn respond(
        &self,
        request: RemoteRequest,
        files: Vec<FileMetadata>,
    ) -> Result<Vec<FileMetadata>, ApiError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(files)
    }
}

#[async_trait]
impl FileServer for MockFileServer {
    async fn tags(&self) -> Result<Vec<String>, ApiError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        let mut tags = self.tags.clone();
        tags.sort();
        Ok(tags)
    }

    async fn files(&self) -> Result<Vec<FileMetadata>, ApiError> {
        self.respond(RemoteRequest::ListAll, self.files.clone()).await
    }

    async fn files_by_type(&self, file_type: &str) -> Result<Vec<FileMetadata>, ApiError> {
        let matching = self
            .files
            .iter()
            .filter(|f| f.file_type == file_type)
            .cloned()
            .collect();
        self.respond(
            RemoteRequest::ListByType {
                file_type: file_type.to_string(),
            },
            matching,
        )
        .await
    }

    async fn query(&self, condition: &Condition) -> Result<Vec<FileMetadata>, ApiError> {
        let matching = self
            .files
            .iter()
            .filter(|f| condition.file_type.is_empty() || f.file_type == condition.file_type)
            .filter(|f| condition.tags.iter().all(|t| f.has_tag(t)))
            .cloned()
            .collect();
        self.respond(RemoteRequest::Conditional(condition.clone()), matching)
            .await
    }

    fn content_url(&self, file: &FileMetadata) -> String {
        format!("http://test/content/{}", file.id)
    }
}

//! From filter selection through fetching to thumbnails and the slideshow,
//! against a mocked server.

mod common;

use async_trait::async_trait;
use common::{FileServerFixture, text_files_json};
use media_browser::backends::FileServer;
use media_browser::core::FetchState;
use media_browser::core::viewmodels::{BrowseScope, BrowserViewModel, ViewModel};
use media_browser::models::{MediaCategory, ThumbnailState};
use media_browser::services::{ThumbnailGenerator, ThumbnailRequest};
use media_browser::state::FilterStore;
use media_browser::utils::ThumbnailError;
use media_browser::workers::{
    PipelineSettings, SlideshowController, SlideshowSettings, ThumbnailPipeline,
};
use serde_json::json;
use std::sync::Arc;

fn names(state: &FetchState) -> Vec<String> {
    state
        .loaded()
        .map(|files| files.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default()
}

/// Fails for sources whose URL ends in one of `broken`.
#[derive(Debug)]
struct ScriptedGenerator {
    broken: Vec<&'static str>,
}

#[async_trait]
impl ThumbnailGenerator for ScriptedGenerator {
    async fn generate(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError> {
        if self.broken.iter().any(|b| request.source_url.ends_with(b)) {
            return Err(ThumbnailError::Generation("unsupported codec".to_string()));
        }
        Ok(format!("file:///cache/{}.jpg", request.id))
    }
}

#[tokio::test]
async fn test_tag_selection_with_empty_type() {
    let mut fixture = FileServerFixture::new().await;
    let listing = fixture.mock_get("/files", &text_files_json()).await;
    let query = fixture
        .mock_query(
            "",
            &["tag 1"],
            &json!([
                { "name": "file 2.txt", "id": "2", "ty": "txt", "tags": ["tag 1"] },
                { "name": "file 3.txt", "id": "3", "ty": "txt", "tags": ["tag 1", "tag 2"] }
            ]),
        )
        .await;

    let filters = FilterStore::new();
    let server: Arc<dyn FileServer> = Arc::new(fixture.client.clone());
    let vm = BrowserViewModel::new(server, filters.clone(), BrowseScope::Type(String::new()));

    vm.sync().await;
    assert_eq!(names(&vm.files()).len(), 3);

    filters.select_tag("tag 1");
    vm.sync().await;
    assert_eq!(names(&vm.files()), vec!["file 2.txt", "file 3.txt"]);

    // Searching narrows locally without another request
    filters.set_search("FILE 3");
    vm.sync().await;
    assert_eq!(names(&vm.files()), vec!["file 3.txt"]);

    listing.assert_async().await;
    query.assert_async().await;
}

#[tokio::test]
async fn test_search_over_full_listing() {
    let mut fixture = FileServerFixture::new().await;
    let _mock = fixture.mock_get("/files", &text_files_json()).await;

    let filters = FilterStore::new();
    filters.set_search("file 1");
    let server: Arc<dyn FileServer> = Arc::new(fixture.client.clone());
    let vm = BrowserViewModel::new(server, filters, BrowseScope::default());

    vm.sync().await;
    assert_eq!(names(&vm.files()), vec!["file 1.txt"]);
}

#[tokio::test]
async fn test_failed_fetch_surfaces_error_state() {
    let mut fixture = FileServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/files")
        .with_status(503)
        .create_async()
        .await;
    let _mock = fixture.mock_get("/tags", &json!(["b", "a"])).await;

    let server: Arc<dyn FileServer> = Arc::new(fixture.client.clone());
    let vm = BrowserViewModel::new(server, FilterStore::new(), BrowseScope::default());
    vm.initialize().await;

    assert!(vm.files().is_failed());
    assert_eq!(vm.tags().loaded().cloned(), Some(vec!["a".to_string(), "b".to_string()]));
    vm.dispose();
}

#[tokio::test]
async fn test_video_thumbnails_keep_order_and_isolate_failures() {
    let mut fixture = FileServerFixture::new().await;
    let _mock = fixture
        .mock_get(
            "/files/mp4",
            &json!([
                { "name": "one.mp4", "id": "1", "ty": "mp4", "tags": [] },
                { "name": "two.mp4", "id": "2", "ty": "mp4", "tags": [] },
                { "name": "three.mp4", "id": "3", "ty": "mp4", "tags": [] }
            ]),
        )
        .await;

    let server: Arc<dyn FileServer> = Arc::new(fixture.client.clone());
    let vm = BrowserViewModel::new(
        server,
        FilterStore::new(),
        BrowseScope::Category(MediaCategory::Videos),
    );
    vm.sync().await;

    let items = vm.media_items();
    assert_eq!(items.len(), 3);
    assert!(items[1].source_url.ends_with("/content/2"));

    let pipeline = ThumbnailPipeline::new(
        Arc::new(ScriptedGenerator {
            broken: vec!["/content/2"],
        }),
        PipelineSettings::default(),
    );
    pipeline.start(items);
    let settled = pipeline.settled().await;

    let ids: Vec<_> = settled.iter().map(|i| i.id().to_string()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(
        settled.into_iter().map(|i| i.thumbnail).collect::<Vec<_>>(),
        vec![
            ThumbnailState::Ready {
                uri: "file:///cache/1.jpg".to_string()
            },
            ThumbnailState::Failed,
            ThumbnailState::Ready {
                uri: "file:///cache/3.jpg".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_slideshow_over_fetched_list() {
    let mut fixture = FileServerFixture::new().await;
    let _mock = fixture.mock_get("/files", &text_files_json()).await;

    let server: Arc<dyn FileServer> = Arc::new(fixture.client.clone());
    let vm = BrowserViewModel::new(server, FilterStore::new(), BrowseScope::default());
    vm.sync().await;
    let len = vm.media_items().len();

    let slideshow = SlideshowController::spawn(SlideshowSettings::default());
    slideshow.open(2, len);
    slideshow.press(0.0);
    slideshow.release(120.0);
    assert_eq!(slideshow.snapshot().await.current_index(), Some(0));

    slideshow.press(120.0);
    slideshow.release(0.0);
    assert_eq!(slideshow.snapshot().await.current_index(), Some(2));

    slideshow.long_press();
    assert!(!slideshow.snapshot().await.is_open());
}

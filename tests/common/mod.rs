//! Shared fixtures for the integration tests. Server responses are served
//! by mockito so the real HTTP client is exercised end to end.

#![allow(dead_code)]

use media_browser::backends::FileServerClient;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};
use std::time::Duration;

pub fn text_files_json() -> Value {
    json!([
        { "name": "file 1.txt", "id": "1", "ty": "txt", "tags": [] },
        { "name": "file 2.txt", "id": "2", "ty": "txt", "tags": ["tag 1"] },
        { "name": "file 3.txt", "id": "3", "ty": "txt", "tags": ["tag 1", "tag 2"] }
    ])
}

pub fn video_files_json() -> Value {
    json!([
        { "name": "clip a.mp4", "id": "10", "ty": "mp4", "tags": ["holiday"] },
        { "name": "clip b.mp4", "id": "11", "ty": "mp4", "tags": [] }
    ])
}

/// A mock file server plus a client pointed at it.
pub struct FileServerFixture {
    pub server: ServerGuard,
    pub client: FileServerClient,
}

impl FileServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let client = FileServerClient::new(&server.url(), Duration::from_secs(5))
            .expect("mock server url is valid");
        Self { server, client }
    }

    pub async fn mock_get(&mut self, path: &str, body: &Value) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// `POST /query` answering `body` when the request carries `ty` and
    /// exactly `tags`.
    pub async fn mock_query(&mut self, ty: &str, tags: &[&str], body: &Value) -> Mock {
        self.server
            .mock("POST", "/query")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "data": { "ty": ty, "tags": tags } })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }
}

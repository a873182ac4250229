use async_trait::async_trait;
use futures::future::try_join_all;

use super::file_server::ApiError;
use crate::core::query::{Condition, RemoteRequest};
use crate::models::FileMetadata;

#[async_trait]
pub trait FileServer: Send + Sync + std::fmt::Debug {
    /// All tags known to the server, sorted lexicographically
    async fn tags(&self) -> Result<Vec<String>, ApiError>;

    /// Every file, unfiltered
    async fn files(&self) -> Result<Vec<FileMetadata>, ApiError>;

    async fn files_by_type(&self, file_type: &str) -> Result<Vec<FileMetadata>, ApiError>;

    /// Files matching a type (empty = any) and the given tags
    async fn query(&self, condition: &Condition) -> Result<Vec<FileMetadata>, ApiError>;

    /// URL the raw bytes of `file` are served from
    fn content_url(&self, file: &FileMetadata) -> String;

    async fn execute(&self, request: &RemoteRequest) -> Result<Vec<FileMetadata>, ApiError> {
        match request {
            RemoteRequest::ListAll => self.files().await,
            RemoteRequest::ListByType { file_type } => self.files_by_type(file_type).await,
            RemoteRequest::Conditional(condition) => self.query(condition).await,
        }
    }

    /// Runs every request concurrently and concatenates the results in
    /// request order. The first failure fails the whole batch.
    async fn execute_all(
        &self,
        requests: &[RemoteRequest],
    ) -> Result<Vec<FileMetadata>, ApiError> {
        let results = try_join_all(requests.iter().map(|request| self.execute(request))).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

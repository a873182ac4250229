use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::errors::ApiError;
use crate::backends::traits::FileServer;
use crate::core::query::Condition;
use crate::models::FileMetadata;

#[derive(Serialize)]
struct QueryBody<'a> {
    data: QueryData<'a>,
}

#[derive(Serialize)]
struct QueryData<'a> {
    ty: &'a str,
    tags: Vec<&'a str>,
}

/// HTTP client for the file server.
#[derive(Debug, Clone)]
pub struct FileServerClient {
    client: reqwest::Client,
    base_url: Url,
}

impl FileServerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            warn!("Request to {} failed with {}", url, status);
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(ApiError::from_reqwest)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        self.read_json(response).await
    }
}

#[async_trait]
impl FileServer for FileServerClient {
    async fn tags(&self) -> Result<Vec<String>, ApiError> {
        let mut tags: Vec<String> = self.get_json(&["tags"]).await?;
        tags.sort();
        Ok(tags)
    }

    async fn files(&self) -> Result<Vec<FileMetadata>, ApiError> {
        self.get_json(&["files"]).await
    }

    async fn files_by_type(&self, file_type: &str) -> Result<Vec<FileMetadata>, ApiError> {
        self.get_json(&["files", file_type]).await
    }

    async fn query(&self, condition: &Condition) -> Result<Vec<FileMetadata>, ApiError> {
        let url = self.endpoint(&["query"]);
        let body = QueryBody {
            data: QueryData {
                ty: &condition.file_type,
                tags: condition.tags.iter().map(String::as_str).collect(),
            },
        };
        debug!(
            "POST {} ty={:?} tags={:?}",
            url, condition.file_type, condition.tags
        );

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        self.read_json(response).await
    }

    fn content_url(&self, file: &FileMetadata) -> String {
        self.endpoint(&["content", file.id.as_str()]).to_string()
    }
}

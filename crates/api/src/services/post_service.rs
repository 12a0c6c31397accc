//! HTTP client for the posts/comments backend.
//!
//! Posts, comments and sport fields live in a separate service. This adapter
//! implements the [`PostService`] port over its admin and post endpoints.

use std::time::Duration;

use async_trait::async_trait;
use domain::ports::{PostService, PostServiceError, PostStats};
use reqwest::{header::HeaderMap, header::HeaderValue, Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PostsConfig;

const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Subset of the post representation this service reads.
#[derive(Debug, Deserialize)]
struct PostSummary {
    #[serde(alias = "titolo")]
    title: String,
}

#[derive(Debug, Clone)]
pub struct HttpPostService {
    client: Client,
    base_url: Url,
}

impl HttpPostService {
    pub fn new(config: &PostsConfig) -> Result<Self, PostServiceError> {
        // `Url::join` replaces the last segment unless the base ends in a slash.
        let mut raw = config.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|e| PostServiceError::InvalidResponse(format!("invalid base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        if !config.service_token.is_empty() {
            let value = HeaderValue::from_str(&config.service_token)
                .map_err(|e| PostServiceError::InvalidResponse(format!("invalid service token: {e}")))?;
            headers.insert(SERVICE_TOKEN_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PostServiceError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, PostServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| PostServiceError::InvalidResponse(format!("invalid path {path}: {e}")))
    }

    async fn delete(&self, path: &str) -> Result<(), PostServiceError> {
        let url = self.url(path)?;
        debug!(url = %url, "Calling post service");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(unreachable)?;

        check_status(response).await.map(|_| ())
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, PostServiceError> {
        let url = self.url(path)?;
        debug!(url = %url, "Calling post service");

        let response = self.client.get(url).send().await.map_err(unreachable)?;
        check_status(response).await
    }
}

fn unreachable(err: reqwest::Error) -> PostServiceError {
    PostServiceError::Unreachable(err.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PostServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "Post service rejected request");
    Err(PostServiceError::Rejected {
        status: status.as_u16(),
        message: if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            message
        },
    })
}

#[async_trait]
impl PostService for HttpPostService {
    async fn delete_post(&self, post_id: i64) -> Result<(), PostServiceError> {
        self.delete(&format!("admin/posts/{post_id}")).await
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), PostServiceError> {
        self.delete(&format!("admin/comments/{comment_id}")).await
    }

    async fn stats(&self) -> Result<PostStats, PostServiceError> {
        self.get("admin/stats")
            .await?
            .json::<PostStats>()
            .await
            .map_err(|e| PostServiceError::InvalidResponse(e.to_string()))
    }

    async fn post_title(&self, post_id: i64) -> Result<String, PostServiceError> {
        self.get(&format!("posts/{post_id}"))
            .await?
            .json::<PostSummary>()
            .await
            .map(|post| post.title)
            .map_err(|e| PostServiceError::InvalidResponse(e.to_string()))
    }
}

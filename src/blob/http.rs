use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{BlobError, BlobStore};

/// Client for a Supabase-style storage REST API.
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.service_key.is_empty() {
            return req;
        }
        req.bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn check(&self, response: reqwest::Response) -> Result<(), BlobError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.classify(status, body))
    }

    fn classify(&self, status: StatusCode, body: String) -> BlobError {
        if body.contains("Bucket not found") {
            return BlobError::BucketMissing(self.bucket.clone());
        }
        let policy_violation = body.contains("row-level security")
            || body.contains("new row violates")
            || body.contains("permission denied");
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) || policy_violation {
            return BlobError::PermissionDenied(body);
        }
        BlobError::Rejected {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl BlobStore for HttpObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, path);
        tracing::debug!(path, size = bytes.len(), "uploading object");
        let response = self
            .authorized(self.client.post(&url))
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        self.check(response).await
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, path)
    }

    async fn remove(&self, path: &str) -> Result<(), BlobError> {
        let url = format!("{}/object/{}", self.base_url, self.bucket);
        tracing::debug!(path, "removing object");
        let response = self
            .authorized(self.client.delete(&url))
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;
        self.check(response).await
    }
}

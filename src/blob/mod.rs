//! Object storage for scanned paper diary pages.

use async_trait::async_trait;

pub mod http;

pub use http::HttpObjectStore;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlobError {
    #[error("Storage upload permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage bucket '{0}' does not exist")]
    BucketMissing(String),

    #[error("Storage rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for BlobError {
    fn from(e: reqwest::Error) -> Self {
        BlobError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `path`. Never overwrites an existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError>;

    /// Publicly retrievable URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, path: &str) -> Result<(), BlobError>;
}

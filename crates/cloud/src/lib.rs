//! Object storage for generated preview frames.
//!
//! The store is write-only from the pipeline's point of view: frames are
//! uploaded under deterministic keys and served straight from the CDN, so
//! the only operation is an idempotent put returning the public URL.

use async_trait::async_trait;

pub mod memory;
pub mod s3;

pub use memory::InMemoryBlobStore;
pub use s3::S3BlobStore;

/// Error type for blob uploads.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob upload failed: {0}")]
    Upload(String),
}

/// Opaque blob repository with deterministic public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` with public-read visibility and return
    /// the public URL. Concurrent puts of the same key converge.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, BlobError>;
}

/// Compose the public URL for a storage key.
pub fn public_url(public_host: &str, key: &str) -> String {
    format!("{}/{}", public_host.trim_end_matches('/'), key)
}

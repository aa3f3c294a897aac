//! S3 implementation of the blob store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use crate::{public_url, BlobError, BlobStore};

/// Blob store backed by an S3 bucket fronted by a public CDN host.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_host: String,
}

impl S3BlobStore {
    /// Build a store using the SDK's standard environment credentials and
    /// region resolution.
    pub async fn from_env(bucket: String, public_host: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket,
            public_host,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        tracing::debug!(bucket = %self.bucket, key = %key, "frame uploaded");
        Ok(public_url(&self.public_host, key))
    }
}

//! The generation worker: extract one frame, upload it, commit the result.

use std::sync::Arc;

use sqlx::PgPool;

use previewd_cloud::{BlobError, BlobStore};
use previewd_core::ffmpeg::ExtractError;
use previewd_core::hashing;
use previewd_core::link::reencode_once;
use previewd_db::repositories::preview_repo::PreviewRepo;
use previewd_dedup::DedupRegistry;
use previewd_service::PreviewConfig;

use crate::extractor::FrameExtractor;

/// Error type for a generation attempt. Anything that escapes
/// [`GenerateWorker::run`] is transient and goes back to the queue's
/// bounded retry.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Consumes `generate(video_link)` jobs.
pub struct GenerateWorker {
    pool: PgPool,
    dedup: Arc<dyn DedupRegistry>,
    blob: Arc<dyn BlobStore>,
    extractor: Arc<dyn FrameExtractor>,
    http: reqwest::Client,
    config: PreviewConfig,
}

impl GenerateWorker {
    pub fn new(
        pool: PgPool,
        dedup: Arc<dyn DedupRegistry>,
        blob: Arc<dyn BlobStore>,
        extractor: Arc<dyn FrameExtractor>,
        config: PreviewConfig,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            pool,
            dedup,
            blob,
            extractor,
            http,
            config,
        })
    }

    /// Run one generation attempt for `video_link`.
    ///
    /// Concurrent duplicates already collapsed at the queue layer; the
    /// record check below keeps a re-delivered job from overwriting a
    /// finished preview.
    pub async fn run(&self, video_link: &str) -> Result<(), GenerateError> {
        let Some(record) = PreviewRepo::find_by_link(&self.pool, video_link).await? else {
            // The service layer recreates the row on the next request.
            tracing::debug!(video_link, "no record for generation job, skipping");
            return Ok(());
        };
        if record.has_real_frame(&self.config.placeholder_url) {
            tracing::debug!(video_link, "preview already generated, skipping");
            self.clear_queued(video_link).await;
            return Ok(());
        }

        PreviewRepo::mark_running(&self.pool, video_link).await?;

        match self.generate(video_link).await {
            Ok(public_url) => {
                PreviewRepo::mark_success(&self.pool, video_link, &public_url).await?;
                self.clear_queued(video_link).await;
                tracing::info!(video_link, url = %public_url, "preview generated");
                Ok(())
            }
            Err(GenerateError::Extract(error)) if error.is_permanent() => {
                // A source that will never yield a frame is stored as a
                // success pointing at the placeholder; it is not retried
                // until an operator clears the row.
                tracing::warn!(video_link, %error, "permanent extraction failure, storing placeholder");
                PreviewRepo::mark_success(&self.pool, video_link, &self.config.placeholder_url)
                    .await?;
                self.clear_queued(video_link).await;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(video_link, %error, "preview generation failed");
                if let Err(store_error) = PreviewRepo::mark_failed(&self.pool, video_link).await {
                    tracing::warn!(video_link, %store_error, "failed to record failed attempt");
                }
                self.clear_queued(video_link).await;
                Err(error)
            }
        }
    }

    /// Resolve the source, extract one frame, and upload it. Returns the
    /// public URL of the stored frame.
    async fn generate(&self, video_link: &str) -> Result<String, GenerateError> {
        let source = self.resolve_source(video_link).await;

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(ExtractError::Io)?;
        let frame_path = self
            .config
            .work_dir
            .join(format!("{}.jpg", hashing::sha1_hex(video_link.as_bytes())));

        let bytes = self
            .extractor
            .extract(&source, &self.config.extract_ts, &frame_path)
            .await?;
        let _ = tokio::fs::remove_file(&frame_path).await;

        let key = hashing::storage_key(&self.config.blob_prefix, video_link);
        let url = self.blob.put(&key, bytes, "image/jpeg").await?;
        Ok(url)
    }

    /// Follow redirects to the effective source URL, then re-encode its
    /// path and query exactly once. Resolution failures fall through to
    /// the extractor, which classifies them.
    async fn resolve_source(&self, video_link: &str) -> String {
        let resolved = match self
            .http
            .head(video_link)
            .timeout(self.config.head_timeout)
            .send()
            .await
        {
            Ok(response) => response.url().to_string(),
            Err(error) => {
                tracing::debug!(video_link, %error, "source resolution failed, using link as-is");
                video_link.to_string()
            }
        };
        reencode_once(&resolved)
    }

    /// Release the `queued:*` gate so the link can be dispatched again.
    async fn clear_queued(&self, video_link: &str) {
        let key = hashing::queued_key(video_link);
        if let Err(error) = self.dedup.delete(&key).await {
            tracing::warn!(video_link, %error, "failed to clear queued key");
        }
    }
}

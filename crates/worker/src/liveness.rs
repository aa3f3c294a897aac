//! The liveness worker: re-validate a stored preview URL and put dead
//! entries back through generation.

use std::sync::Arc;

use sqlx::PgPool;

use previewd_core::status::PreviewStatus;
use previewd_db::repositories::preview_repo::PreviewRepo;
use previewd_dedup::DedupRegistry;
use previewd_queue::TaskQueue;
use previewd_service::dispatch::enqueue_generation;
use previewd_service::{HttpProbe, PreviewConfig};

/// Error type for a liveness run.
#[derive(Debug, thiserror::Error)]
pub enum LivenessError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Consumes `check(video_link)` jobs scheduled by batch reads.
pub struct LivenessWorker {
    pool: PgPool,
    dedup: Arc<dyn DedupRegistry>,
    queue: Arc<dyn TaskQueue>,
    probe: Arc<dyn HttpProbe>,
    config: PreviewConfig,
}

impl LivenessWorker {
    pub fn new(
        pool: PgPool,
        dedup: Arc<dyn DedupRegistry>,
        queue: Arc<dyn TaskQueue>,
        probe: Arc<dyn HttpProbe>,
        config: PreviewConfig,
    ) -> Self {
        Self {
            pool,
            dedup,
            queue,
            probe,
            config,
        }
    }

    /// Probe the stored URL for `video_link` once.
    pub async fn run(&self, video_link: &str) -> Result<(), LivenessError> {
        let Some(record) = PreviewRepo::find_by_link(&self.pool, video_link).await? else {
            return Ok(());
        };
        if record.status() != PreviewStatus::Success {
            return Ok(());
        }

        match self
            .probe
            .head(&record.preview_url, self.config.head_timeout)
            .await
        {
            Ok(200) => {
                PreviewRepo::touch_checked(&self.pool, video_link).await?;
                tracing::debug!(video_link, "preview URL verified");
            }
            result => {
                match result {
                    Ok(status) => {
                        tracing::info!(video_link, status, "preview URL is dead, regenerating")
                    }
                    Err(error) => {
                        tracing::info!(video_link, %error, "preview URL probe failed, regenerating")
                    }
                }
                PreviewRepo::mark_failed(&self.pool, video_link).await?;
                enqueue_generation(
                    &*self.dedup,
                    &*self.queue,
                    video_link,
                    self.config.queued_ttl,
                )
                .await;
            }
        }
        Ok(())
    }
}

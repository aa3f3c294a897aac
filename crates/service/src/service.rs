//! The preview façade called by request handlers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use previewd_core::backoff::retry_eligible;
use previewd_core::error::CoreError;
use previewd_core::link::validate_video_link;
use previewd_core::status::PreviewStatus;
use previewd_core::types::Timestamp;
use previewd_db::models::preview::PreviewRecord;
use previewd_db::repositories::preview_repo::PreviewRepo;
use previewd_dedup::DedupRegistry;
use previewd_queue::TaskQueue;

use crate::config::PreviewConfig;
use crate::dispatch::{enqueue_check, enqueue_generation};
use crate::probe::HttpProbe;

/// Synchronous lesson-preview façade.
///
/// Many request handlers share one instance; all state lives in the
/// backing store, the dedup registry, and the queue.
pub struct PreviewService {
    pool: PgPool,
    dedup: Arc<dyn DedupRegistry>,
    queue: Arc<dyn TaskQueue>,
    probe: Arc<dyn HttpProbe>,
    config: PreviewConfig,
}

impl PreviewService {
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

    /// Return the URL to display for `video_link` right now, creating the
    /// record and dispatching generation when needed.
    ///
    /// The only surfaced error is an empty link. Store, queue, and probe
    /// failures degrade to the placeholder; a later call picks the work
    /// back up.
    pub async fn get_or_schedule_preview(
        &self,
        video_link: &str,
        skip_url_check: bool,
    ) -> Result<String, CoreError> {
        let link = validate_video_link(video_link)?;

        let record = match PreviewRepo::find_by_link(&self.pool, link).await {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(video_link = link, %error, "preview store read failed");
                return Ok(self.placeholder());
            }
        };

        let Some(record) = record else {
            return Ok(self.create_and_dispatch(link).await);
        };

        let now = Utc::now();
        match record.status() {
            PreviewStatus::Success => Ok(self.serve_success(&record, skip_url_check, now).await),
            PreviewStatus::Pending | PreviewStatus::Running => {
                // Normally nothing to do; a row whose dispatch watermark
                // predates the queued-key TTL was orphaned by a queue
                // outage or worker crash and is safe to re-dispatch.
                if is_stale(record.enqueued_at, now, self.config.queued_ttl)
                    && enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl)
                        .await
                {
                    if let Err(error) = PreviewRepo::mark_enqueued(&self.pool, link).await {
                        tracing::warn!(video_link = link, %error, "failed to refresh enqueued_at");
                    }
                }
                Ok(record.preview_url)
            }
            PreviewStatus::Failed => {
                if retry_eligible(record.attempts, record.updated_at, now)
                    && enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl)
                        .await
                {
                    if let Err(error) = PreviewRepo::requeue(&self.pool, link).await {
                        tracing::warn!(video_link = link, %error, "failed to requeue preview");
                    }
                }
                Ok(self.placeholder())
            }
        }
    }

    /// Batch lookup: one bulk read, one bulk insert for unknown links, and
    /// only asynchronous liveness checks — never a synchronous probe.
    ///
    /// Duplicates and empty entries are dropped; every surviving link maps
    /// to a URL.
    pub async fn get_previews_batch(&self, video_links: &[String]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let links: Vec<String> = video_links
            .iter()
            .filter_map(|raw| validate_video_link(raw).ok())
            .filter(|link| seen.insert(link.to_string()))
            .map(str::to_string)
            .collect();

        let mut urls = HashMap::with_capacity(links.len());
        if links.is_empty() {
            return urls;
        }

        let records = match PreviewRepo::find_by_links(&self.pool, &links).await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(%error, "preview store bulk read failed");
                for link in links {
                    urls.insert(link, self.placeholder());
                }
                return urls;
            }
        };
        let by_link: HashMap<&str, &PreviewRecord> = records
            .iter()
            .map(|record| (record.video_link.as_str(), record))
            .collect();

        let now = Utc::now();
        let mut unknown = Vec::new();
        for link in &links {
            match by_link.get(link.as_str()) {
                Some(record) => {
                    let url = self.resolve_existing(record, now).await;
                    urls.insert(link.clone(), url);
                }
                None => unknown.push(link.clone()),
            }
        }

        if !unknown.is_empty() {
            match PreviewRepo::bulk_create_pending(
                &self.pool,
                &unknown,
                &self.config.placeholder_url,
            )
            .await
            {
                Ok(_) => {
                    for link in unknown {
                        enqueue_generation(&*self.dedup, &*self.queue, &link, self.config.queued_ttl)
                            .await;
                        urls.insert(link, self.placeholder());
                    }
                }
                Err(error) => {
                    // Degrade without dispatching: a job without a record
                    // is a no-op, and the next read recreates both.
                    tracing::warn!(%error, "bulk preview creation failed");
                    for link in unknown {
                        urls.insert(link, self.placeholder());
                    }
                }
            }
        }

        urls
    }

    /// Apply the single-link state rules to an existing record without any
    /// synchronous probing.
    async fn resolve_existing(&self, record: &PreviewRecord, now: Timestamp) -> String {
        let link = record.video_link.as_str();
        match record.status() {
            PreviewStatus::Success => {
                if is_stale(record.checked_at, now, self.config.check_ttl) {
                    enqueue_check(&*self.dedup, &*self.queue, link, self.config.checking_ttl).await;
                }
                record.preview_url.clone()
            }
            PreviewStatus::Pending | PreviewStatus::Running => {
                if is_stale(record.enqueued_at, now, self.config.queued_ttl)
                    && enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl)
                        .await
                {
                    if let Err(error) = PreviewRepo::mark_enqueued(&self.pool, link).await {
                        tracing::warn!(video_link = link, %error, "failed to refresh enqueued_at");
                    }
                }
                record.preview_url.clone()
            }
            PreviewStatus::Failed => {
                if retry_eligible(record.attempts, record.updated_at, now)
                    && enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl)
                        .await
                {
                    if let Err(error) = PreviewRepo::requeue(&self.pool, link).await {
                        tracing::warn!(video_link = link, %error, "failed to requeue preview");
                    }
                }
                self.placeholder()
            }
        }
    }

    /// Serve a SUCCESS record, re-validating its URL with a synchronous
    /// HEAD probe when the last verification has gone stale.
    async fn serve_success(
        &self,
        record: &PreviewRecord,
        skip_url_check: bool,
        now: Timestamp,
    ) -> String {
        let link = record.video_link.as_str();
        if skip_url_check || !is_stale(record.checked_at, now, self.config.check_ttl) {
            return record.preview_url.clone();
        }

        match self
            .probe
            .head(&record.preview_url, self.config.head_timeout)
            .await
        {
            Ok(200) => {
                if let Err(error) = PreviewRepo::touch_checked(&self.pool, link).await {
                    tracing::warn!(video_link = link, %error, "failed to stamp checked_at");
                }
                record.preview_url.clone()
            }
            result => {
                match result {
                    Ok(status) => tracing::info!(
                        video_link = link,
                        status,
                        "stored preview URL is dead, regenerating"
                    ),
                    Err(error) => tracing::info!(
                        video_link = link,
                        %error,
                        "preview URL probe failed, regenerating"
                    ),
                }
                if let Err(error) = PreviewRepo::mark_failed(&self.pool, link).await {
                    tracing::warn!(video_link = link, %error, "failed to mark preview failed");
                }
                enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl).await;
                self.placeholder()
            }
        }
    }

    /// First sighting of a link: create the pending row and dispatch
    /// generation. Another process may have completed the preview between
    /// our read and the insert, in which case its URL is served directly.
    async fn create_and_dispatch(&self, link: &str) -> String {
        let record =
            match PreviewRepo::create_pending(&self.pool, link, &self.config.placeholder_url).await
            {
                Ok(record) => record,
                Err(error) => {
                    tracing::warn!(video_link = link, %error, "preview record creation failed");
                    return self.placeholder();
                }
            };

        if record.status() == PreviewStatus::Success {
            return record.preview_url;
        }

        enqueue_generation(&*self.dedup, &*self.queue, link, self.config.queued_ttl).await;
        record.preview_url
    }

    fn placeholder(&self) -> String {
        self.config.placeholder_url.clone()
    }
}

/// Whether an optional timestamp is missing or older than `ttl`.
fn is_stale(timestamp: Option<Timestamp>, now: Timestamp, ttl: Duration) -> bool {
    match timestamp {
        Some(ts) => match now.signed_duration_since(ts).to_std() {
            Ok(age) => age > ttl,
            // A timestamp in the future counts as fresh.
            Err(_) => false,
        },
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    #[test]
    fn missing_timestamp_is_stale() {
        assert!(is_stale(None, Utc::now(), Duration::from_secs(60)));
    }

    #[test]
    fn fresh_timestamp_is_not_stale() {
        let now = Utc::now();
        assert!(!is_stale(
            Some(now - ChronoDuration::seconds(30)),
            now,
            Duration::from_secs(60)
        ));
    }

    #[test]
    fn old_timestamp_is_stale() {
        let now = Utc::now();
        assert!(is_stale(
            Some(now - ChronoDuration::seconds(90)),
            now,
            Duration::from_secs(60)
        ));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = Utc::now();
        assert!(!is_stale(
            Some(now + ChronoDuration::seconds(90)),
            now,
            Duration::from_secs(60)
        ));
    }
}

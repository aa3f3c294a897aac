//! Dedup-gated job dispatch shared by the service façade and the liveness
//! worker.
//!
//! The gate and the queue use the *same* SHA-1 of the raw video link, so a
//! submission suppressed here and one collapsed on the queue's task-id
//! index agree about identity.

use std::time::Duration;

use previewd_core::hashing;
use previewd_dedup::DedupRegistry;
use previewd_queue::{Job, TaskQueue};

/// Dispatch a generation job for `video_link`, gated by the `queued:*`
/// dedup key. Returns `true` when a job was actually submitted.
///
/// A dedup-registry outage degrades to dispatching anyway: the queue's
/// unique task id still collapses duplicates among queued jobs, just
/// without cross-completion suppression.
pub async fn enqueue_generation(
    dedup: &dyn DedupRegistry,
    queue: &dyn TaskQueue,
    video_link: &str,
    queued_ttl: Duration,
) -> bool {
    let key = hashing::queued_key(video_link);
    match dedup.try_set(&key, queued_ttl).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(video_link, "generation already queued, skipping dispatch");
            return false;
        }
        Err(error) => {
            tracing::warn!(video_link, %error, "dedup registry unavailable, dispatching anyway");
        }
    }

    let job = Job::generate(video_link, hashing::generate_task_id(video_link));
    match queue.submit(job).await {
        Ok(()) => {
            tracing::debug!(video_link, "generation job dispatched");
            true
        }
        Err(error) => {
            tracing::warn!(video_link, %error, "generation dispatch failed");
            // Release the gate so the next request can retry immediately.
            if let Err(error) = dedup.delete(&key).await {
                tracing::warn!(video_link, %error, "failed to release queued key");
            }
            false
        }
    }
}

/// Dispatch an asynchronous liveness check for `video_link`, gated by the
/// `checking:*` dedup key. Returns `true` when a job was submitted.
pub async fn enqueue_check(
    dedup: &dyn DedupRegistry,
    queue: &dyn TaskQueue,
    video_link: &str,
    checking_ttl: Duration,
) -> bool {
    let key = hashing::checking_key(video_link);
    match dedup.try_set(&key, checking_ttl).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(error) => {
            tracing::warn!(video_link, %error, "dedup registry unavailable, dispatching anyway");
        }
    }

    let job = Job::check(video_link, hashing::check_task_id(video_link));
    match queue.submit(job).await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(video_link, %error, "liveness dispatch failed");
            if let Err(error) = dedup.delete(&key).await {
                tracing::warn!(video_link, %error, "failed to release checking key");
            }
            false
        }
    }
}

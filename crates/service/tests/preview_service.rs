//! Integration tests for the preview façade, using in-memory dedup/queue
//! doubles and a canned probe against a real database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use previewd_core::hashing;
use previewd_core::status::PreviewStatus;
use previewd_db::repositories::preview_repo::PreviewRepo;
use previewd_dedup::InMemoryDedup;
use previewd_queue::{InMemoryQueue, JOB_CHECK, JOB_GENERATE};
use previewd_service::{HttpProbe, PreviewConfig, PreviewService, ProbeError};

/// Probe double answering every HEAD with a fixed status code.
struct StaticProbe {
    status: u16,
    calls: AtomicUsize,
}

impl StaticProbe {
    fn new(status: u16) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpProbe for StaticProbe {
    async fn head(&self, _url: &str, _timeout: Duration) -> Result<u16, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status)
    }
}

struct Harness {
    service: Arc<PreviewService>,
    dedup: Arc<InMemoryDedup>,
    queue: Arc<InMemoryQueue>,
    probe: Arc<StaticProbe>,
    config: PreviewConfig,
}

fn harness(pool: PgPool, probe_status: u16) -> Harness {
    let config = PreviewConfig::default();
    let dedup = Arc::new(InMemoryDedup::new());
    let queue = Arc::new(InMemoryQueue::new());
    let probe = Arc::new(StaticProbe::new(probe_status));
    let service = Arc::new(PreviewService::new(
        pool,
        dedup.clone(),
        queue.clone(),
        probe.clone(),
        config.clone(),
    ));
    Harness {
        service,
        dedup,
        queue,
        probe,
        config,
    }
}

/// Age a record's liveness stamp so the next read sees it as stale.
async fn age_checked_at(pool: &PgPool, link: &str) {
    sqlx::query(
        "UPDATE lesson_previews SET checked_at = NOW() - INTERVAL '10 hours' WHERE video_link = $1",
    )
    .bind(link)
    .execute(pool)
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_link_is_rejected(pool: PgPool) {
    let h = harness(pool, 200);
    assert!(h.service.get_or_schedule_preview("", false).await.is_err());
    assert!(h.service.get_or_schedule_preview("   ", false).await.is_err());
}

// ---------------------------------------------------------------------------
// Cold miss
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn cold_miss_returns_placeholder_and_dispatches(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();
    assert_eq!(url, h.config.placeholder_url);

    let record = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();
    assert_eq!(record.status(), PreviewStatus::Pending);
    assert_eq!(record.preview_url, h.config.placeholder_url);
    assert!(record.enqueued_at.is_some());

    let submitted = h.queue.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].name, JOB_GENERATE);
    assert_eq!(submitted[0].task_id, hashing::generate_task_id(link));
    assert!(h.dedup.contains(&hashing::queued_key(link)).await);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn pending_record_is_not_redispatched(pool: PgPool) {
    let h = harness(pool, 200);
    let link = "https://cdn.example/a.mp4";

    h.service.get_or_schedule_preview(link, false).await.unwrap();
    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, h.config.placeholder_url);
    assert_eq!(h.queue.submitted().await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_cold_misses_dispatch_exactly_once(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/b.mp4";

    let calls = (0..25).map(|_| {
        let service = h.service.clone();
        async move { service.get_or_schedule_preview(link, false).await.unwrap() }
    });
    let urls = futures::future::join_all(calls).await;

    for url in urls {
        assert_eq!(url, h.config.placeholder_url);
    }
    assert_eq!(h.queue.count_for_task(&hashing::generate_task_id(link)).await, 1);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lesson_previews")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

// ---------------------------------------------------------------------------
// SUCCESS records
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn fresh_success_returns_url_without_probing(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";
    let stored = "https://cdn.lessonview.app/previews/abc.jpg";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_success(&pool, link, stored).await.unwrap();

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, stored);
    assert_eq!(h.probe.calls(), 0);
    assert!(h.queue.submitted().await.is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stale_success_with_live_url_restamps_checked_at(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";
    let stored = "https://cdn.lessonview.app/previews/abc.jpg";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_success(&pool, link, stored).await.unwrap();
    age_checked_at(&pool, link).await;
    let before = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, stored);
    assert_eq!(h.probe.calls(), 1);
    let after = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();
    assert!(after.checked_at > before.checked_at);
    assert_eq!(after.status(), PreviewStatus::Success);
    assert!(h.queue.submitted().await.is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stale_success_with_dead_url_fails_and_redispatches(pool: PgPool) {
    let h = harness(pool.clone(), 404);
    let link = "https://cdn.example/a.mp4";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_success(&pool, link, "https://cdn.lessonview.app/previews/abc.jpg")
        .await
        .unwrap();
    age_checked_at(&pool, link).await;

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, h.config.placeholder_url);
    let record = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();
    assert_eq!(record.status(), PreviewStatus::Failed);
    assert_eq!(record.attempts, 1);

    let submitted = h.queue.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].name, JOB_GENERATE);
    assert_eq!(submitted[0].task_id, hashing::generate_task_id(link));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn skip_url_check_never_probes(pool: PgPool) {
    let h = harness(pool.clone(), 404);
    let link = "https://cdn.example/a.mp4";
    let stored = "https://cdn.lessonview.app/previews/abc.jpg";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_success(&pool, link, stored).await.unwrap();
    age_checked_at(&pool, link).await;

    let url = h.service.get_or_schedule_preview(link, true).await.unwrap();

    assert_eq!(url, stored);
    assert_eq!(h.probe.calls(), 0);
}

// ---------------------------------------------------------------------------
// FAILED records and backoff
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_record_inside_backoff_window_is_left_alone(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_failed(&pool, link).await.unwrap();

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, h.config.placeholder_url);
    assert!(h.queue.submitted().await.is_empty());
    let record = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();
    assert_eq!(record.status(), PreviewStatus::Failed);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_record_past_backoff_is_requeued(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_failed(&pool, link).await.unwrap();
    // attempts=1 gates for 15 minutes; move the failure 20 minutes back.
    sqlx::query(
        "UPDATE lesson_previews SET updated_at = NOW() - INTERVAL '20 minutes' \
         WHERE video_link = $1",
    )
    .bind(link)
    .execute(&pool)
    .await
    .unwrap();

    let url = h.service.get_or_schedule_preview(link, false).await.unwrap();

    assert_eq!(url, h.config.placeholder_url);
    assert_eq!(h.queue.submitted().await.len(), 1);
    let record = PreviewRepo::find_by_link(&pool, link).await.unwrap().unwrap();
    assert_eq!(record.status(), PreviewStatus::Pending);
    assert_eq!(record.attempts, 1);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn batch_with_mixed_states(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let unknown = "https://cdn.example/l1.mp4";
    let fresh = "https://cdn.example/l2.mp4";
    let stale = "https://cdn.example/l3.mp4";
    let fresh_url = "https://cdn.lessonview.app/previews/l2.jpg";
    let stale_url = "https://cdn.lessonview.app/previews/l3.jpg";

    for (link, url) in [(fresh, fresh_url), (stale, stale_url)] {
        PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
            .await
            .unwrap();
        PreviewRepo::mark_success(&pool, link, url).await.unwrap();
    }
    age_checked_at(&pool, stale).await;

    let urls = h
        .service
        .get_previews_batch(&[
            unknown.to_string(),
            fresh.to_string(),
            stale.to_string(),
        ])
        .await;

    assert_eq!(urls[unknown], h.config.placeholder_url);
    assert_eq!(urls[fresh], fresh_url);
    assert_eq!(urls[stale], stale_url);

    // The batch path never probes synchronously.
    assert_eq!(h.probe.calls(), 0);

    let record = PreviewRepo::find_by_link(&pool, unknown).await.unwrap().unwrap();
    assert_eq!(record.status(), PreviewStatus::Pending);

    let submitted = h.queue.submitted().await;
    assert_eq!(submitted.len(), 2);
    let generate = submitted.iter().find(|j| j.name == JOB_GENERATE).unwrap();
    assert_eq!(generate.task_id, hashing::generate_task_id(unknown));
    let check = submitted.iter().find(|j| j.name == JOB_CHECK).unwrap();
    assert_eq!(check.task_id, hashing::check_task_id(stale));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn batch_agrees_with_single_lookup(pool: PgPool) {
    let h = harness(pool.clone(), 200);
    let link = "https://cdn.example/a.mp4";
    PreviewRepo::create_pending(&pool, link, &h.config.placeholder_url)
        .await
        .unwrap();
    PreviewRepo::mark_success(&pool, link, "https://cdn.lessonview.app/previews/abc.jpg")
        .await
        .unwrap();

    let single = h.service.get_or_schedule_preview(link, true).await.unwrap();
    let batch = h.service.get_previews_batch(&[link.to_string()]).await;

    assert_eq!(batch[link], single);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn batch_drops_duplicates_and_empty_links(pool: PgPool) {
    let h = harness(pool, 200);
    let link = "https://cdn.example/a.mp4";

    let urls = h
        .service
        .get_previews_batch(&[link.to_string(), link.to_string(), "  ".to_string()])
        .await;

    assert_eq!(urls.len(), 1);
    assert_eq!(urls[link], h.config.placeholder_url);
    assert_eq!(h.queue.count_for_task(&hashing::generate_task_id(link)).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_batch_returns_empty_map(pool: PgPool) {
    let h = harness(pool, 200);
    let urls = h.service.get_previews_batch(&[]).await;
    assert!(urls.is_empty());
}

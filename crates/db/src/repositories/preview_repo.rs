//! Repository for the `lesson_previews` table.

use sqlx::PgPool;

use previewd_core::status::PreviewStatus;

use crate::models::preview::PreviewRecord;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, video_link, preview_url, status, attempts, \
    enqueued_at, checked_at, generated_at, created_at, updated_at";

/// Per-record reads and state transitions for lesson previews.
///
/// Every mutation is a single-row update keyed by `video_link`; no
/// cross-record transactions exist.
pub struct PreviewRepo;

impl PreviewRepo {
    /// Find a preview record by its raw video link.
    pub async fn find_by_link(
        pool: &PgPool,
        video_link: &str,
    ) -> Result<Option<PreviewRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lesson_previews WHERE video_link = $1");
        sqlx::query_as::<_, PreviewRecord>(&query)
            .bind(video_link)
            .fetch_optional(pool)
            .await
    }

    /// Bulk read of all existing records for the given links.
    pub async fn find_by_links(
        pool: &PgPool,
        video_links: &[String],
    ) -> Result<Vec<PreviewRecord>, sqlx::Error> {
        if video_links.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM lesson_previews WHERE video_link = ANY($1)");
        sqlx::query_as::<_, PreviewRecord>(&query)
            .bind(video_links)
            .fetch_all(pool)
            .await
    }

    /// Create a pending record for an unknown link, or return the existing
    /// row when another caller won the race. `enqueued_at` is stamped at
    /// creation because the caller dispatches a generation job right after.
    pub async fn create_pending(
        pool: &PgPool,
        video_link: &str,
        placeholder_url: &str,
    ) -> Result<PreviewRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO lesson_previews (video_link, preview_url, status, enqueued_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (video_link) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, PreviewRecord>(&query)
            .bind(video_link)
            .bind(placeholder_url)
            .bind(PreviewStatus::Pending.id())
            .fetch_optional(pool)
            .await?;
        match inserted {
            Some(record) => Ok(record),
            None => Self::find_by_link(pool, video_link)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Create pending records for all unknown links in one statement.
    /// Returns only the rows actually inserted; links that already had a
    /// record are skipped.
    pub async fn bulk_create_pending(
        pool: &PgPool,
        video_links: &[String],
        placeholder_url: &str,
    ) -> Result<Vec<PreviewRecord>, sqlx::Error> {
        if video_links.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "INSERT INTO lesson_previews (video_link, preview_url, status, enqueued_at)
             SELECT link, $2, $3, NOW() FROM UNNEST($1::text[]) AS t(link)
             ON CONFLICT (video_link) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PreviewRecord>(&query)
            .bind(video_links)
            .bind(placeholder_url)
            .bind(PreviewStatus::Pending.id())
            .fetch_all(pool)
            .await
    }

    /// Transition a record to RUNNING when a worker picks its job up.
    pub async fn mark_running(pool: &PgPool, video_link: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lesson_previews SET status = $2, updated_at = NOW() WHERE video_link = $1",
        )
        .bind(video_link)
        .bind(PreviewStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Commit a finished generation: the new URL becomes current, the
    /// attempt counter resets, and the row counts as freshly checked.
    pub async fn mark_success(
        pool: &PgPool,
        video_link: &str,
        preview_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lesson_previews SET \
                status = $3, \
                preview_url = $2, \
                attempts = 0, \
                generated_at = NOW(), \
                checked_at = NOW(), \
                updated_at = NOW() \
             WHERE video_link = $1",
        )
        .bind(video_link)
        .bind(preview_url)
        .bind(PreviewStatus::Success.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed attempt. `updated_at` doubles as the failure
    /// timestamp the retry backoff is measured from.
    pub async fn mark_failed(pool: &PgPool, video_link: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lesson_previews SET \
                status = $2, \
                attempts = attempts + 1, \
                updated_at = NOW() \
             WHERE video_link = $1",
        )
        .bind(video_link)
        .bind(PreviewStatus::Failed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put a failed record back in line for generation, preserving its
    /// attempt count.
    pub async fn requeue(pool: &PgPool, video_link: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lesson_previews SET \
                status = $2, \
                enqueued_at = NOW(), \
                updated_at = NOW() \
             WHERE video_link = $1",
        )
        .bind(video_link)
        .bind(PreviewStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refresh the dispatch watermark without touching the status.
    pub async fn mark_enqueued(pool: &PgPool, video_link: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lesson_previews SET enqueued_at = NOW(), updated_at = NOW() \
             WHERE video_link = $1",
        )
        .bind(video_link)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp a successful liveness verification. Deliberately leaves
    /// `updated_at` alone: verifying a URL is not a state change.
    pub async fn touch_checked(pool: &PgPool, video_link: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE lesson_previews SET checked_at = NOW() WHERE video_link = $1")
                .bind(video_link)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

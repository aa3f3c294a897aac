//! Postgres-backed queue adapter over the `preview_jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};

use previewd_core::types::DbId;

use crate::{Job, QueueError, TaskQueue};

/// A job claimed for execution.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimedJob {
    pub id: DbId,
    pub job_name: String,
    pub video_link: String,
    pub task_id: String,
    /// Failed runs so far.
    pub attempts: i32,
}

/// What happened to a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDisposition {
    /// Rescheduled to run again after the retry delay.
    Retried,
    /// Retry budget exhausted; the job row was removed.
    Discarded,
}

/// Queue adapter storing jobs in Postgres.
///
/// Completed jobs are deleted rather than kept, which is what makes a
/// deterministic task id re-submittable once its work is done while
/// duplicates of a queued id still collapse on the unique index.
#[derive(Clone)]
pub struct PgTaskQueue {
    pool: PgPool,
}

impl PgTaskQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claim the oldest runnable job on `queue`, locking it against other
    /// workers. Jobs locked longer than `lock_timeout` count as abandoned
    /// and are claimable again (at-least-once, not exactly-once).
    pub async fn claim(
        &self,
        queue: &str,
        lock_timeout: Duration,
    ) -> Result<Option<ClaimedJob>, QueueError> {
        let abandoned_before = Utc::now()
            - chrono::Duration::from_std(lock_timeout).unwrap_or(chrono::Duration::minutes(10));
        let claimed = sqlx::query_as::<_, ClaimedJob>(
            "UPDATE preview_jobs SET locked_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM preview_jobs \
                 WHERE queue_name = $1 AND run_after <= NOW() \
                   AND (locked_at IS NULL OR locked_at < $2) \
                 ORDER BY id \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, job_name, video_link, task_id, attempts",
        )
        .bind(queue)
        .bind(abandoned_before)
        .fetch_optional(&self.pool)
        .await?;
        Ok(claimed)
    }

    /// Remove a finished job.
    pub async fn complete(&self, id: DbId) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM preview_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Handle a failed run: reschedule after `retry_delay`, or discard the
    /// job once `max_retries` failed runs have accumulated.
    pub async fn retry_or_discard(
        &self,
        job: &ClaimedJob,
        max_retries: i32,
        retry_delay: Duration,
    ) -> Result<JobDisposition, QueueError> {
        if job.attempts + 1 > max_retries {
            sqlx::query("DELETE FROM preview_jobs WHERE id = $1")
                .bind(job.id)
                .execute(&self.pool)
                .await?;
            return Ok(JobDisposition::Discarded);
        }

        let run_after =
            Utc::now() + chrono::Duration::from_std(retry_delay).unwrap_or(chrono::Duration::minutes(1));
        sqlx::query(
            "UPDATE preview_jobs SET \
                attempts = attempts + 1, \
                locked_at = NULL, \
                run_after = $2, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(run_after)
        .execute(&self.pool)
        .await?;
        Ok(JobDisposition::Retried)
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    async fn submit(&self, job: Job) -> Result<(), QueueError> {
        let result = sqlx::query(
            "INSERT INTO preview_jobs (task_id, job_name, video_link, queue_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (task_id) DO NOTHING",
        )
        .bind(&job.task_id)
        .bind(&job.name)
        .bind(&job.video_link)
        .bind(&job.queue)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(task_id = %job.task_id, job = %job.name, "duplicate submission collapsed");
        } else {
            tracing::debug!(task_id = %job.task_id, job = %job.name, "job enqueued");
        }
        Ok(())
    }
}

//! Polling loop feeding claimed jobs to the workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use previewd_queue::pg::{ClaimedJob, JobDisposition, PgTaskQueue};
use previewd_queue::{JOB_CHECK, JOB_GENERATE, QUEUE_PREVIEWS};

use crate::generate::GenerateWorker;
use crate::liveness::LivenessWorker;

/// How long a claimed job may sit locked before another worker may steal
/// it. Comfortably above the extraction timeout so a slow frame grab is
/// not run twice.
pub const JOB_LOCK_TIMEOUT: Duration = Duration::from_secs(600);

/// Loop tunables.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum jobs in flight at once.
    pub concurrency: usize,
    /// Sleep between polls of an empty queue.
    pub poll_interval: Duration,
    /// Queue-level retry budget per job.
    pub max_retries: i32,
    /// Fixed delay before a failed job runs again.
    pub retry_delay: Duration,
}

/// Claim and run jobs until the process is stopped.
pub async fn run_loop(
    queue: PgTaskQueue,
    generate: Arc<GenerateWorker>,
    liveness: Arc<LivenessWorker>,
    runner: RunnerConfig,
) -> anyhow::Result<()> {
    let semaphore = Arc::new(Semaphore::new(runner.concurrency));
    loop {
        let permit = semaphore.clone().acquire_owned().await?;
        match queue.claim(QUEUE_PREVIEWS, JOB_LOCK_TIMEOUT).await {
            Ok(Some(job)) => {
                let queue = queue.clone();
                let generate = generate.clone();
                let liveness = liveness.clone();
                let max_retries = runner.max_retries;
                let retry_delay = runner.retry_delay;
                tokio::spawn(async move {
                    run_job(&queue, &generate, &liveness, job, max_retries, retry_delay).await;
                    drop(permit);
                });
            }
            Ok(None) => {
                drop(permit);
                tokio::time::sleep(runner.poll_interval).await;
            }
            Err(error) => {
                drop(permit);
                tracing::warn!(%error, "job claim failed");
                tokio::time::sleep(runner.poll_interval).await;
            }
        }
    }
}

async fn run_job(
    queue: &PgTaskQueue,
    generate: &GenerateWorker,
    liveness: &LivenessWorker,
    job: ClaimedJob,
    max_retries: i32,
    retry_delay: Duration,
) {
    tracing::debug!(task_id = %job.task_id, job = %job.job_name, "job claimed");

    let result = match job.job_name.as_str() {
        JOB_GENERATE => generate.run(&job.video_link).await.map_err(|e| e.to_string()),
        JOB_CHECK => liveness.run(&job.video_link).await.map_err(|e| e.to_string()),
        other => {
            tracing::warn!(task_id = %job.task_id, job = other, "unknown job name, discarding");
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            if let Err(error) = queue.complete(job.id).await {
                tracing::warn!(task_id = %job.task_id, %error, "failed to complete job");
            }
        }
        Err(error) => {
            tracing::warn!(task_id = %job.task_id, %error, "job failed");
            match queue.retry_or_discard(&job, max_retries, retry_delay).await {
                Ok(JobDisposition::Retried) => {
                    tracing::debug!(task_id = %job.task_id, attempts = job.attempts + 1, "job rescheduled")
                }
                Ok(JobDisposition::Discarded) => {
                    tracing::warn!(task_id = %job.task_id, "retry budget exhausted, job discarded")
                }
                Err(error) => {
                    tracing::warn!(task_id = %job.task_id, %error, "failed to reschedule job")
                }
            }
        }
    }
}

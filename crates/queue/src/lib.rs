//! At-least-once task queue for preview work.
//!
//! The service side only submits; idempotency comes from the caller's
//! deterministic task ids. The worker side claims, completes, and retries
//! with a fixed delay up to a bounded attempt budget.

use async_trait::async_trait;

pub mod memory;
pub mod pg;

pub use memory::InMemoryQueue;
pub use pg::PgTaskQueue;

/// Name of the generation job.
pub const JOB_GENERATE: &str = "generate";

/// Name of the liveness-check job.
pub const JOB_CHECK: &str = "check";

/// Queue all preview jobs run on.
pub const QUEUE_PREVIEWS: &str = "previews";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// A job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// [`JOB_GENERATE`] or [`JOB_CHECK`].
    pub name: String,
    /// Raw video link the job operates on.
    pub video_link: String,
    /// Deterministic id; concurrent submissions of the same id collapse.
    pub task_id: String,
    /// Target queue, normally [`QUEUE_PREVIEWS`].
    pub queue: String,
}

impl Job {
    pub fn generate(video_link: &str, task_id: String) -> Self {
        Self {
            name: JOB_GENERATE.to_string(),
            video_link: video_link.to_string(),
            task_id,
            queue: QUEUE_PREVIEWS.to_string(),
        }
    }

    pub fn check(video_link: &str, task_id: String) -> Self {
        Self {
            name: JOB_CHECK.to_string(),
            video_link: video_link.to_string(),
            task_id,
            queue: QUEUE_PREVIEWS.to_string(),
        }
    }
}

/// At-least-once job submitter keyed by task id.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a job. Submitting a task id that is already queued is a
    /// no-op at the queue layer.
    async fn submit(&self, job: Job) -> Result<(), QueueError>;
}

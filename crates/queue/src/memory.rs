//! In-process queue recording every submission, for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Job, QueueError, TaskQueue};

/// Test queue that records submissions verbatim. It deliberately does not
/// collapse duplicate task ids, so tests can assert that the dedup gate in
/// front of it did.
#[derive(Default)]
pub struct InMemoryQueue {
    submitted: Mutex<Vec<Job>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in order.
    pub async fn submitted(&self) -> Vec<Job> {
        self.submitted.lock().await.clone()
    }

    /// Number of submissions carrying the given task id.
    pub async fn count_for_task(&self, task_id: &str) -> usize {
        self.submitted
            .lock()
            .await
            .iter()
            .filter(|job| job.task_id == task_id)
            .count()
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn submit(&self, job: Job) -> Result<(), QueueError> {
        self.submitted.lock().await.push(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_submissions_in_order() {
        let queue = InMemoryQueue::new();
        queue
            .submit(Job::generate("https://cdn.example/a.mp4", "aaa".into()))
            .await
            .unwrap();
        queue
            .submit(Job::check("https://cdn.example/a.mp4", "check_aaa".into()))
            .await
            .unwrap();

        let submitted = queue.submitted().await;
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].name, crate::JOB_GENERATE);
        assert_eq!(submitted[1].name, crate::JOB_CHECK);
        assert_eq!(queue.count_for_task("aaa").await, 1);
    }
}

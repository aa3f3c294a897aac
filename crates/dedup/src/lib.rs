//! Short-TTL dedup registry suppressing duplicate job submissions.
//!
//! The only operations are insert-if-absent with a TTL and delete, so no
//! read-then-write races exist by design. Keys left behind by a crashed
//! worker simply expire.

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis_registry;

pub use memory::InMemoryDedup;
pub use redis_registry::RedisDedup;

/// Error type for dedup registry operations.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("dedup backend error: {0}")]
    Backend(#[from] redis::RedisError),
}

/// Insert-if-absent key registry with per-key expiry.
#[async_trait]
pub trait DedupRegistry: Send + Sync {
    /// Atomically set `key` with the given TTL if it is absent.
    /// Returns `true` when the key was set, `false` when it already existed.
    async fn try_set(&self, key: &str, ttl: Duration) -> Result<bool, DedupError>;

    /// Remove `key`, releasing the gate early. Missing keys are fine.
    async fn delete(&self, key: &str) -> Result<(), DedupError>;
}

//! Redis-backed dedup registry.

use std::time::Duration;

use async_trait::async_trait;

use crate::{DedupError, DedupRegistry};

/// Dedup registry backed by a shared Redis instance, so suppression works
/// across every process that serves requests or runs workers.
pub struct RedisDedup {
    client: redis::Client,
}

impl RedisDedup {
    /// Create a registry for the given Redis URL
    /// (e.g. `redis://localhost:6379`).
    pub fn connect(redis_url: &str) -> Result<Self, DedupError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }
}

#[async_trait]
impl DedupRegistry for RedisDedup {
    async fn try_set(&self, key: &str, ttl: Duration) -> Result<bool, DedupError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SET NX EX is the atomic insert-if-absent; a nil reply means the
        // key was already held.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), DedupError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }
}

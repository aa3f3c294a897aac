//! In-process dedup registry for tests and single-node development.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{DedupError, DedupRegistry};

/// Dedup registry backed by a mutex-guarded map of expiry instants.
#[derive(Default)]
pub struct InMemoryDedup {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held (unexpired).
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now())
    }
}

#[async_trait]
impl DedupRegistry for InMemoryDedup {
    async fn try_set(&self, key: &str, ttl: Duration) -> Result<bool, DedupError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), DedupError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

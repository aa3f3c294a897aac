//! In-process blob store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{public_url, BlobError, BlobStore};

/// Blob store keeping objects in a map and counting every put, so tests
/// can assert exactly how many uploads happened.
pub struct InMemoryBlobStore {
    public_host: String,
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    puts: Mutex<Vec<String>>,
}

impl InMemoryBlobStore {
    pub fn new(public_host: &str) -> Self {
        Self {
            public_host: public_host.to_string(),
            objects: Mutex::new(HashMap::new()),
            puts: Mutex::new(Vec::new()),
        }
    }

    /// Keys uploaded so far, one entry per put.
    pub async fn puts(&self) -> Vec<String> {
        self.puts.lock().await.clone()
    }

    /// Stored bytes for a key, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).map(|(bytes, _)| bytes.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (bytes, content_type.to_string()));
        self.puts.lock().await.push(key.to_string());
        Ok(public_url(&self.public_host, key))
    }
}

//! Object store port: where signed certificates and CA trust anchors are
//! published.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::ports::StoreResult;

/// Blob store addressed by bucket and key (S3, GCS, a directory on disk).
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `bucket`/`key`, replacing any existing object.
    /// Returns the key written.
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> StoreResult<String>;
}

/// In-memory object store backed by `RwLock<BTreeMap<..>>`.
///
/// Writes to keys containing a configured pattern fail, which lets tests
/// exercise partial publication.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    fail_pattern: Option<String>,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects every key containing `pattern`.
    pub fn failing_on(pattern: impl Into<String>) -> Self {
        Self {
            fail_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Fetch an object's body.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of `put` calls made through the port, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> StoreResult<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(pattern) = &self.fail_pattern
            && key.contains(pattern.as_str())
        {
            return Err(StoreError::backend(format!(
                "error saving object: {bucket}/{key}"
            )));
        }
        self.objects
            .write()
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        Ok(key.to_string())
    }
}

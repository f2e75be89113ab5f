//! Parameter store port: where CA key pairs are persisted.
//!
//! The [`ParameterStore`] trait abstracts a key-value secret store (SSM
//! Parameter Store, Vault, a directory on disk). [`MemoryParameterStore`]
//! provides an in-memory implementation suitable for tests and short-lived
//! processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;

/// Result type for port calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key-value store holding encoded CA key pairs.
///
/// Implementations must be `Send + Sync` so a single store can be shared via
/// `Arc<dyn ParameterStore>` by every issuance in the process. Calls are
/// blocking; retries and timeouts are the implementation's concern.
pub trait ParameterStore: Send + Sync {
    /// Fetch a parameter. Returns `Ok(None)` if it does not exist.
    fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a parameter, replacing any existing value.
    ///
    /// `kms_key_id` names the encryption key the backend should use, if it
    /// encrypts at rest.
    fn put(&self, name: &str, value: &[u8], kms_key_id: Option<&str>) -> StoreResult<()>;

    /// Write a parameter only if it does not exist yet.
    ///
    /// Returns `Ok(true)` if this call created the parameter and `Ok(false)`
    /// if a value was already present (which is left untouched).
    ///
    /// The default implementation is a plain get-then-put and is NOT atomic.
    /// Backends with conditional writes must override it; otherwise two
    /// processes creating the same CA concurrently can each persist a
    /// different key with the last writer winning.
    fn put_if_absent(
        &self,
        name: &str,
        value: &[u8],
        kms_key_id: Option<&str>,
    ) -> StoreResult<bool> {
        if self.get(name)?.is_some() {
            return Ok(false);
        }
        self.put(name, value, kms_key_id)?;
        Ok(true)
    }
}

/// A parameter value together with the encryption key id it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredParameter {
    pub value: Vec<u8>,
    pub kms_key_id: Option<String>,
}

/// In-memory parameter store backed by `RwLock<HashMap<..>>`.
///
/// Counts every call so tests can assert that a code path never touched
/// storage.
#[derive(Default)]
pub struct MemoryParameterStore {
    params: RwLock<HashMap<String, StoredParameter>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryParameterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value without counting it as a port call.
    pub fn insert_raw(&self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.params.write().insert(
            name.into(),
            StoredParameter {
                value: value.into(),
                kms_key_id: None,
            },
        );
    }

    /// Inspect a stored parameter without counting it as a port call.
    pub fn stored(&self, name: &str) -> Option<StoredParameter> {
        self.params.read().get(name).cloned()
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.params.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls made through the port.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of write calls (`put` and `put_if_absent`) made through the port.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl ParameterStore for MemoryParameterStore {
    fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.params.read().get(name).map(|p| p.value.clone()))
    }

    fn put(&self, name: &str, value: &[u8], kms_key_id: Option<&str>) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.params.write().insert(
            name.to_string(),
            StoredParameter {
                value: value.to_vec(),
                kms_key_id: kms_key_id.map(str::to_string),
            },
        );
        Ok(())
    }

    fn put_if_absent(
        &self,
        name: &str,
        value: &[u8],
        kms_key_id: Option<&str>,
    ) -> StoreResult<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        // Check and insert under one write lock.
        let mut params = self.params.write();
        if params.contains_key(name) {
            return Ok(false);
        }
        params.insert(
            name.to_string(),
            StoredParameter {
                value: value.to_vec(),
                kms_key_id: kms_key_id.map(str::to_string),
            },
        );
        Ok(true)
    }
}

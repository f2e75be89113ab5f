//! Storage ports consumed by the issuance core.
//!
//! - [`ParameterStore`]: persists the CA key pairs
//! - [`ObjectStore`]: receives signed certificates and CA trust anchors
//!
//! Both are synchronous `Send + Sync` traits shared via `Arc<dyn ..>`.
//! In-memory implementations serve tests; directory-backed implementations
//! serve the `schism` binary.

pub mod fs;
pub mod object;
pub mod parameter;

pub use fs::{FsObjectStore, FsParameterStore};
pub use object::{MemoryObjectStore, ObjectStore};
pub use parameter::{MemoryParameterStore, ParameterStore, StoreResult, StoredParameter};

//! Directory-backed implementations of both ports.
//!
//! Used by the `schism` binary to run issuances without a cloud account.
//! Layout under the state directory:
//!
//! ```text
//! <root>/params/<name>              CA key pairs
//! <root>/objects/<bucket>/<key>     published objects
//! ```

use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::ports::{ObjectStore, ParameterStore, StoreResult};

/// Reject names that would escape the store root.
fn checked_relative(name: &str) -> StoreResult<&Path> {
    let path = Path::new(name);
    let ok = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(path)
    } else {
        Err(StoreError::backend(format!("invalid store path: {name:?}")))
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

/// Fill a fresh, uniquely named temp file next to `path` and sync it.
///
/// The temp file is removed on drop unless it is persisted.
fn stage(
    path: &Path,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> StoreResult<NamedTempFile> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::backend(format!("no parent directory: {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| StoreError::io(path_string(parent), e))?;

    let mut staged =
        NamedTempFile::new_in(parent).map_err(|e| StoreError::io(path_string(parent), e))?;
    fill(staged.as_file_mut())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| StoreError::io(path_string(staged.path()), e))?;
    Ok(staged)
}

/// Atomically replace `path` with `body`.
fn write_replace(path: &Path, body: &[u8]) -> StoreResult<()> {
    let staged = stage(path, |file| file.write_all(body))?;
    staged
        .persist(path)
        .map_err(|e| StoreError::io(path_string(path), e.error))?;
    Ok(())
}

/// Atomically create `path` from the staged contents unless it already
/// exists. Readers never observe a partially written file, and a failed
/// fill leaves nothing behind.
fn create_if_absent(
    path: &Path,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> StoreResult<bool> {
    let staged = stage(path, fill)?;
    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::io(path_string(path), e.error)),
    }
}

/// Parameter store keeping one file per parameter.
pub struct FsParameterStore {
    root: PathBuf,
}

impl FsParameterStore {
    /// Store parameters under `<state_dir>/params`.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            root: state_dir.as_ref().join("params"),
        }
    }

    fn path_for(&self, name: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join(checked_relative(name)?))
    }
}

impl ParameterStore for FsParameterStore {
    fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path_string(&path), e)),
        }
    }

    fn put(&self, name: &str, value: &[u8], kms_key_id: Option<&str>) -> StoreResult<()> {
        if let Some(key_id) = kms_key_id {
            debug!(name, key_id, "filesystem parameter store does not encrypt; ignoring key id");
        }
        write_replace(&self.path_for(name)?, value)
    }

    fn put_if_absent(
        &self,
        name: &str,
        value: &[u8],
        kms_key_id: Option<&str>,
    ) -> StoreResult<bool> {
        if let Some(key_id) = kms_key_id {
            debug!(name, key_id, "filesystem parameter store does not encrypt; ignoring key id");
        }
        create_if_absent(&self.path_for(name)?, |file| file.write_all(value))
    }
}

/// Object store keeping one file per object.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Store objects under `<state_dir>/objects`.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            root: state_dir.as_ref().join("objects"),
        }
    }

    /// Path an object is (or would be) stored at.
    pub fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        Ok(self
            .root
            .join(checked_relative(bucket)?)
            .join(checked_relative(key)?))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> StoreResult<String> {
        write_replace(&self.object_path(bucket, key)?, body)?;
        Ok(key.to_string())
    }
}

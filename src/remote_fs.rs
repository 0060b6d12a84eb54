//! The remote distributed filesystem, an external collaborator specified
//! only by the interface the core consumes. Production callers implement
//! [`RemoteFs`] over their own client; tests use [`NullRemoteFs`].

use std::path::Path;

use async_trait::async_trait;

use crate::error::CacheError;

/// The remote modification timestamp observed for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStat {
    pub mtime: i64,
}

/// Resolution and copy operations the localizer needs from the remote
/// distributed filesystem.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Stats the remote path, returning its modification timestamp.
    async fn stat(&self, path: &str) -> Result<RemoteStat, CacheError>;

    /// Copies the remote file at `path` to the local `dest` path.
    async fn copy_to_local(&self, path: &str, dest: &Path) -> Result<(), CacheError>;
}

/// A [`RemoteFs`] backed by a fixed in-memory table, for unit tests and
/// examples. Every stat returns the timestamp registered for the path
/// (or an I/O error if none was registered); copies write a fixed byte
/// payload so callers can assert materialization happened.
#[derive(Debug, Default, Clone)]
pub struct NullRemoteFs {
    entries: std::collections::HashMap<String, (i64, Vec<u8>)>,
}

impl NullRemoteFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fake remote file at `path` with the given modification
    /// timestamp and byte contents.
    pub fn with_file(mut self, path: impl Into<String>, mtime: i64, contents: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(path.into(), (mtime, contents.into()));
        self
    }

    /// Mutates the registered timestamp for an already-registered path,
    /// simulating the remote file changing between two acquires.
    pub fn set_mtime(&mut self, path: &str, mtime: i64) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.0 = mtime;
        }
    }
}

#[async_trait]
impl RemoteFs for NullRemoteFs {
    async fn stat(&self, path: &str) -> Result<RemoteStat, CacheError> {
        self.entries
            .get(path)
            .map(|(mtime, _)| RemoteStat { mtime: *mtime })
            .ok_or_else(|| CacheError::IoError(format!("no such remote path: {path}")))
    }

    async fn copy_to_local(&self, path: &str, dest: &Path) -> Result<(), CacheError> {
        let (_, contents) = self
            .entries
            .get(path)
            .ok_or_else(|| CacheError::IoError(format!("no such remote path: {path}")))?;
        tokio::fs::write(dest, contents).await.map_err(crate::error::io_err)
    }
}

/// A [`RemoteFs`] that treats `uri.path` as an ordinary path on the local
/// filesystem. Used by the `localizer-cached` binary as the default
/// collaborator: against a real cluster, callers plug in their own
/// distributed-filesystem client instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

#[async_trait]
impl RemoteFs for LocalFs {
    async fn stat(&self, path: &str) -> Result<RemoteStat, CacheError> {
        let metadata = tokio::fs::metadata(path).await.map_err(crate::error::io_err)?;
        let modified = metadata.modified().map_err(crate::error::io_err)?;
        let mtime = modified
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| CacheError::IoError(e.to_string()))?
            .as_secs() as i64;
        Ok(RemoteStat { mtime })
    }

    async fn copy_to_local(&self, path: &str, dest: &Path) -> Result<(), CacheError> {
        tokio::fs::copy(path, dest).await.map_err(crate::error::io_err)?;
        Ok(())
    }
}

//! Wires the leaf components into the single entry point task
//! setup/teardown code actually calls. The per-component modules stay
//! private implementation detail; [`DistributedCache`] is the crate's
//! public surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CacheError;
use crate::eviction;
use crate::extractor::ArchiveExtractor;
use crate::identity::{check_uris, CacheUri, FsDefaults};
use crate::localizer::{Localizer, DEFAULT_CACHE_SIZE_BYTES};
use crate::registry::{ArtifactKind, Registry};
use crate::remote_fs::{RemoteFs, RemoteStat};
use crate::symlink::project_all;

/// The node-local cache manager. One instance is constructed per process
/// and shared (behind an `Arc`) across every concurrent task-setup
/// thread, rather than living as global state.
pub struct DistributedCache<F: RemoteFs, E: ArchiveExtractor> {
    registry: Registry,
    localizer: Localizer<F, E>,
    base_dir: PathBuf,
    default_fs_host: String,
    size_bound: u64,
}

impl<F: RemoteFs, E: ArchiveExtractor> DistributedCache<F, E> {
    pub fn new(base_dir: impl Into<PathBuf>, default_fs_host: impl Into<String>, remote_fs: Arc<F>, extractor: Arc<E>) -> Self {
        Self {
            registry: Registry::new(),
            localizer: Localizer::new(remote_fs, extractor),
            base_dir: base_dir.into(),
            default_fs_host: default_fs_host.into(),
            size_bound: DEFAULT_CACHE_SIZE_BYTES,
        }
    }

    pub fn with_size_bound(mut self, size_bound: u64) -> Self {
        self.size_bound = size_bound;
        self
    }

    fn defaults(&self) -> FsDefaults {
        FsDefaults { default_host: self.default_fs_host.clone() }
    }

    /// Localizes `uri`, returning the local path a task should read from.
    /// See [`Localizer::acquire`](crate::localizer::Localizer::acquire) for
    /// the full algorithm.
    #[allow(clippy::too_many_arguments)]
    pub async fn acquire(
        &self,
        uri: &CacheUri,
        kind: ArtifactKind,
        remote_stat: Option<RemoteStat>,
        expected_stamp: i64,
        work_dir: Option<&Path>,
        symlinks_enabled: bool,
    ) -> Result<PathBuf, CacheError> {
        self.localizer
            .acquire(
                &self.registry,
                uri,
                &self.defaults(),
                &self.base_dir,
                kind,
                remote_stat,
                expected_stamp,
                work_dir,
                symlinks_enabled,
                self.size_bound,
            )
            .await
    }

    /// Releases one reference on `uri`'s entry. A no-op if `uri` was
    /// never acquired.
    pub async fn release(&self, uri: &CacheUri) -> Result<(), CacheError> {
        eviction::release(&self.registry, uri, &self.defaults()).await
    }

    /// Sweeps every idle entry out of the cache, regardless of disk
    /// usage. See [`eviction::reclaim`].
    pub async fn reclaim(&self) -> Result<(), CacheError> {
        eviction::reclaim(&self.registry).await
    }

    /// Deletes every cache entry and clears the registry, regardless of
    /// refcounts. Operator-initiated reinitialization only.
    pub async fn purge(&self) {
        eviction::purge(&self.registry).await
    }

    /// Bulk symlink projection: every direct child of `job_cache_dir`
    /// gets a same-named symlink under `work_dir`.
    pub async fn project_all(&self, job_cache_dir: &Path, work_dir: &Path) -> Result<(), CacheError> {
        project_all(job_cache_dir, work_dir).await
    }

    /// Number of entries currently tracked by the registry.
    pub fn entry_count(&self) -> usize {
        self.registry.len()
    }
}

/// Verifies fragment uniqueness across a set of files/archives before job
/// submission. Free function so it can be called without a constructed
/// [`DistributedCache`].
pub fn check_uris_before_submission(files: &[CacheUri], archives: &[CacheUri]) -> bool {
    check_uris(files, archives)
}

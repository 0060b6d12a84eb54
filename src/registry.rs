//! Process-wide mapping from `cacheId` to [`CacheStatus`].
//!
//! The registry lock is held only for the duration of map mutation, never
//! across disk I/O: [`Registry::get_or_create`] computes-or-inserts
//! atomically via [`moka::sync::Cache::get_with`], and every mutable field
//! of [`CacheStatus`] lives behind its own per-entry [`tokio::sync::Mutex`]
//! (the entry lock) so that distinct artifacts localize concurrently while
//! operations on one `cacheId` are totally ordered.

use std::path::PathBuf;
use std::sync::Arc;

use moka::sync::Cache as ConcurrentMap;
use tokio::sync::Mutex;

use crate::identity::local_load_path;

/// Whether a registry entry is a plain file or an archive to be expanded
/// on localization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    File,
    Archive,
}

/// Mutable state tracked for one localized artifact.
#[derive(Debug)]
pub struct CacheStatus {
    /// The local directory allocated to this entry. Immutable after
    /// creation.
    pub local_load_path: PathBuf,
    /// File or archive; recorded at creation so later callers don't need
    /// to re-pass `isArchive` on every acquire/release.
    pub kind: ArtifactKind,
    /// False until first successful localization; true thereafter.
    pub materialized: bool,
    /// Count of live acquirers. Never negative.
    pub refcount: u64,
    /// Remote modification timestamp captured at last successful
    /// materialization; `-1` if never materialized.
    pub mtime: i64,
}

impl CacheStatus {
    fn new(local_load_path: PathBuf, kind: ArtifactKind) -> Self {
        Self { local_load_path, kind, materialized: false, refcount: 0, mtime: -1 }
    }
}

/// `cacheId -> CacheStatus` map guarded by the registry lock.
#[derive(Clone)]
pub struct Registry {
    entries: ConcurrentMap<String, Arc<Mutex<CacheStatus>>>,
}

impl Registry {
    /// Creates an empty registry. Unbounded: eviction is driven entirely
    /// by the refcount/disk-budget policy in [`crate::eviction`], not by
    /// any capacity this map would otherwise enforce on its own.
    pub fn new() -> Self {
        Self { entries: ConcurrentMap::builder().build() }
    }

    /// Returns the entry for `cache_id`, inserting a fresh one rooted at
    /// `base_dir/cache_id` if absent.
    pub fn get_or_create(
        &self,
        cache_id: &str,
        base_dir: &std::path::Path,
        kind: ArtifactKind,
    ) -> Arc<Mutex<CacheStatus>> {
        self.entries.get_with(cache_id.to_string(), || {
            Arc::new(Mutex::new(CacheStatus::new(local_load_path(base_dir, cache_id), kind)))
        })
    }

    /// Looks up an existing entry without creating one.
    pub fn get(&self, cache_id: &str) -> Option<Arc<Mutex<CacheStatus>>> {
        self.entries.get(cache_id)
    }

    /// Drops the mapping for `cache_id`. A no-op if absent.
    pub fn remove(&self, cache_id: &str) {
        self.entries.invalidate(cache_id);
    }

    /// Snapshot of every `(cacheId, entry)` pair currently registered.
    /// Iteration order is unspecified.
    pub fn snapshot(&self) -> Vec<(String, Arc<Mutex<CacheStatus>>)> {
        self.entries.iter().map(|(k, v)| ((*k).clone(), v)).collect()
    }

    /// Drops every mapping. Used by [`crate::eviction::purge`].
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of entries currently registered. Walks a live snapshot
    /// rather than `entry_count`, whose approximate count can lag a few
    /// ticks behind `invalidate`/`invalidate_all` under moka's internal
    /// maintenance schedule.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

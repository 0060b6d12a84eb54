//! Materializes a cache entry: copies bytes locally, extracts archives
//! when applicable, sets executable permission, updates the entry's
//! metadata. Also piggybacks best-effort eviction on every acquire once
//! disk usage exceeds the configured bound.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CacheError;
use crate::eviction::{disk_usage, reclaim};
use crate::extractor::ArchiveExtractor;
use crate::freshness::is_fresh_and_present;
use crate::identity::{cache_id, CacheUri, FsDefaults};
use crate::registry::{ArtifactKind, Registry};
use crate::remote_fs::{RemoteFs, RemoteStat};
use crate::symlink::create_symlink;

/// Default local disk budget for a base directory: 1 MiB, matching
/// `local.cache.size`'s documented default.
pub const DEFAULT_CACHE_SIZE_BYTES: u64 = 1_048_576;

/// Materializes artifacts into a [`Registry`], delegating remote access
/// and archive expansion to the injected [`RemoteFs`]/[`ArchiveExtractor`]
/// collaborators.
pub struct Localizer<F: RemoteFs, E: ArchiveExtractor> {
    remote_fs: Arc<F>,
    extractor: Arc<E>,
}

impl<F: RemoteFs, E: ArchiveExtractor> Localizer<F, E> {
    pub fn new(remote_fs: Arc<F>, extractor: Arc<E>) -> Self {
        Self { remote_fs, extractor }
    }

    /// Localizes `uri` into `registry`, returning the path a task should
    /// read from: a registry lookup-or-insert, a freshness check under the
    /// entry lock, a copy-and-extract when stale or missing, an optional
    /// symlink, then a disk-usage check that may trigger eviction.
    #[allow(clippy::too_many_arguments)]
    pub async fn acquire(
        &self,
        registry: &Registry,
        uri: &CacheUri,
        defaults: &FsDefaults,
        base_dir: &Path,
        kind: ArtifactKind,
        remote_stat: Option<RemoteStat>,
        expected_stamp: i64,
        work_dir: Option<&Path>,
        symlinks_enabled: bool,
        size_bound: u64,
    ) -> Result<PathBuf, CacheError> {
        let cid = cache_id(uri, defaults)?;
        let entry = registry.get_or_create(&cid, base_dir, kind);

        let result_path = {
            let mut guard = entry.lock().await;

            let fresh =
                is_fresh_and_present(&guard, uri, expected_stamp, remote_stat, self.remote_fs.as_ref())
                    .await?;

            if !fresh {
                if guard.refcount >= 1 && guard.materialized {
                    return Err(CacheError::CacheInUse { cache_id: cid });
                }

                self.materialize(&mut guard, uri, kind).await?;
            }

            let result_path = match kind {
                ArtifactKind::Archive => guard.local_load_path.clone(),
                ArtifactKind::File => guard.local_load_path.join(basename(&guard.local_load_path)),
            };

            if symlinks_enabled {
                if let (Some(fragment), Some(work_dir)) = (&uri.fragment, work_dir) {
                    create_symlink(&result_path, &work_dir.join(fragment)).await?;
                }
            }

            guard.refcount += 1;
            result_path
        };

        if disk_usage(base_dir).await? > size_bound {
            reclaim(registry).await?;
        }

        Ok(result_path)
    }

    async fn materialize(
        &self,
        guard: &mut crate::registry::CacheStatus,
        uri: &CacheUri,
        kind: ArtifactKind,
    ) -> Result<(), CacheError> {
        if tokio::fs::try_exists(&guard.local_load_path).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&guard.local_load_path).await.map_err(crate::error::io_err)?;
        }
        tokio::fs::create_dir_all(&guard.local_load_path).await.map_err(crate::error::io_err)?;

        let parchive = guard.local_load_path.join(basename(&guard.local_load_path));
        self.remote_fs.copy_to_local(&uri.path, &parchive).await?;

        if kind == ArtifactKind::Archive {
            let lower = parchive.to_string_lossy().to_lowercase();
            let dest_dir = guard.local_load_path.clone();
            if lower.ends_with(".jar") {
                self.extractor.extract_jar(&parchive, &dest_dir).await?;
            } else if lower.ends_with(".zip") {
                self.extractor.extract_zip(&parchive, &dest_dir).await?;
            }
            // Any other extension is left in place: a non-extractable
            // archive extension is a no-op, not an error.
        }

        if let Err(err) = set_executable_recursively(&parchive).await {
            tracing::warn!(path = %parchive.display(), error = %err, "permission set interrupted");
        }

        guard.mtime = self.remote_fs.stat(&uri.path).await?.mtime;
        guard.materialized = true;

        if let Err(err) = stamp_mtime(&parchive, guard.mtime).await {
            tracing::warn!(path = %parchive.display(), error = %err, "failed to stamp local mtime");
        }

        Ok(())
    }
}

/// Sets `path`'s on-disk modification time to the remote stamp, so a tool
/// inspecting the cache directory directly (without consulting the
/// registry) can still see which remote revision an entry reflects.
/// Best-effort: a failure here never fails localization.
async fn stamp_mtime(path: &Path, mtime: i64) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let stamp = filetime::FileTime::from_unix_time(mtime, 0);
        filetime::set_file_mtime(&path, stamp)
    })
    .await
    .map_err(std::io::Error::other)?
}

fn basename(path: &Path) -> std::ffi::OsString {
    path.file_name().map(|n| n.to_os_string()).unwrap_or_default()
}

#[cfg(unix)]
async fn set_executable_recursively(root: &Path) -> std::io::Result<()> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || chmod_tree(&root))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
}

#[cfg(unix)]
fn chmod_tree(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.is_symlink() {
        return Ok(());
    }

    let mut perms = metadata.permissions();
    let mode = perms.mode() | 0o111;
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms)?;

    if metadata.is_dir() {
        for entry in std::fs::read_dir(path)? {
            chmod_tree(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn set_executable_recursively(_root: &Path) -> std::io::Result<()> {
    Ok(())
}

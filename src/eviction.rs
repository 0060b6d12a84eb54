//! Increments/decrements per-entry refcounts; on size overflow, reclaims
//! entries whose refcount is zero.

use std::path::Path;

use crate::error::CacheError;
use crate::identity::{cache_id, CacheUri, FsDefaults};
use crate::registry::Registry;

/// Decrements the refcount for `uri`'s entry, floored at zero. A release
/// for an id with no registry entry is a no-op, not an error.
pub async fn release(registry: &Registry, uri: &CacheUri, defaults: &FsDefaults) -> Result<(), CacheError> {
    let cid = cache_id(uri, defaults)?;
    let Some(entry) = registry.get(&cid) else {
        return Ok(());
    };
    let mut guard = entry.lock().await;
    guard.refcount = guard.refcount.saturating_sub(1);
    Ok(())
}

/// Sweeps every currently-idle entry (`refcount == 0`) out of the
/// registry and off disk. Opportunistic, not budget-meeting: there is no
/// guarantee disk usage falls below any particular bound afterward, and
/// iteration order is unspecified.
pub async fn reclaim(registry: &Registry) -> Result<(), CacheError> {
    for (cid, entry) in registry.snapshot() {
        let local_load_path = {
            let guard = entry.lock().await;
            if guard.refcount != 0 {
                continue;
            }
            guard.local_load_path.clone()
        };

        if tokio::fs::try_exists(&local_load_path).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&local_load_path).await.map_err(crate::error::io_err)?;
        }
        registry.remove(&cid);
    }
    Ok(())
}

/// Deletes every entry's directory regardless of refcounts and clears the
/// registry. Intended only for operator-initiated reinitialization, where
/// loss of in-flight tasks' caches is accepted. Delete errors are logged
/// and swallowed, never propagated.
pub async fn purge(registry: &Registry) {
    for (cid, entry) in registry.snapshot() {
        let local_load_path = {
            let guard = entry.lock().await;
            guard.local_load_path.clone()
        };
        if tokio::fs::try_exists(&local_load_path).await.unwrap_or(false) {
            if let Err(err) = tokio::fs::remove_dir_all(&local_load_path).await {
                tracing::warn!(cache_id = %cid, error = %err, "failed to remove cache entry during purge");
            }
        }
    }
    registry.clear();
}

/// Computes the total size, in bytes, of every regular file under
/// `base_dir`, walked recursively. Symlinks are not followed.
pub async fn disk_usage(base_dir: &Path) -> Result<u64, CacheError> {
    let base_dir = base_dir.to_path_buf();
    tokio::task::spawn_blocking(move || walk_size(&base_dir))
        .await
        .map_err(|e| CacheError::IoError(e.to_string()))?
}

fn walk_size(path: &Path) -> Result<u64, CacheError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(crate::error::io_err(err)),
    };

    if metadata.is_symlink() {
        return Ok(0);
    }
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    if !metadata.is_dir() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in std::fs::read_dir(path).map_err(crate::error::io_err)? {
        let entry = entry.map_err(crate::error::io_err)?;
        total += walk_size(&entry.path())?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CacheUri;
    use crate::registry::ArtifactKind;
    use tempfile::tempdir;

    fn defaults() -> FsDefaults {
        FsDefaults { default_host: "default".to_string() }
    }

    #[tokio::test]
    async fn release_unknown_id_is_a_noop() {
        let registry = Registry::new();
        let uri = CacheUri::parse("dfs://h/a#b").unwrap();
        release(&registry, &uri, &defaults()).await.unwrap();
        release(&registry, &uri, &defaults()).await.unwrap();
    }

    #[tokio::test]
    async fn reclaim_spares_entries_with_live_refcount() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let uri = CacheUri::parse("dfs://h/idle#i").unwrap();
        let cid = cache_id(&uri, &defaults()).unwrap();
        let entry = registry.get_or_create(&cid, dir.path(), ArtifactKind::File);
        {
            let mut guard = entry.lock().await;
            tokio::fs::create_dir_all(&guard.local_load_path).await.unwrap();
            guard.materialized = true;
            guard.refcount = 1;
        }

        reclaim(&registry).await.unwrap();

        assert!(registry.get(&cid).is_some());
        assert!(entry.lock().await.local_load_path.exists());
    }

    #[tokio::test]
    async fn reclaim_removes_idle_entries() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let uri = CacheUri::parse("dfs://h/idle#i").unwrap();
        let cid = cache_id(&uri, &defaults()).unwrap();
        let entry = registry.get_or_create(&cid, dir.path(), ArtifactKind::File);
        let path = {
            let guard = entry.lock().await;
            tokio::fs::create_dir_all(&guard.local_load_path).await.unwrap();
            guard.local_load_path.clone()
        };

        reclaim(&registry).await.unwrap();

        assert!(registry.get(&cid).is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn purge_clears_registry_even_with_live_refcounts() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let uri = CacheUri::parse("dfs://h/a#a").unwrap();
        let cid = cache_id(&uri, &defaults()).unwrap();
        let entry = registry.get_or_create(&cid, dir.path(), ArtifactKind::File);
        {
            let mut guard = entry.lock().await;
            tokio::fs::create_dir_all(&guard.local_load_path).await.unwrap();
            guard.refcount = 5;
        }

        purge(&registry).await;

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn disk_usage_sums_nested_files() {
        let dir = tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("a/b")).await.unwrap();
        tokio::fs::write(dir.path().join("a/one.bin"), vec![0u8; 10]).await.unwrap();
        tokio::fs::write(dir.path().join("a/b/two.bin"), vec![0u8; 20]).await.unwrap();

        assert_eq!(disk_usage(dir.path()).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn disk_usage_of_missing_dir_is_zero() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert_eq!(disk_usage(&missing).await.unwrap(), 0);
    }
}

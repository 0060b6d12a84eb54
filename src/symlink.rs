//! Creates per-task symlinks from an entry's local path into a task's
//! working directory under a caller-supplied fragment name. Symlink
//! creation never overwrites an existing link; existence is treated as
//! success.

use std::path::Path;

use crate::error::CacheError;

/// Creates `link -> target`, unless `link` already exists.
pub async fn create_symlink(target: &Path, link: &Path) -> Result<(), CacheError> {
    if tokio::fs::symlink_metadata(link).await.is_ok() {
        return Ok(());
    }

    if let Some(parent) = link.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(crate::error::io_err)?;
    }

    match platform_symlink(target, link).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(crate::error::io_err(err)),
    }
}

#[cfg(unix)]
async fn platform_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(not(unix))]
async fn platform_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}

/// For every direct child of `job_cache_dir`, creates a symlink
/// `work_dir/<name> -> <absolute path>`. Skips silently if either path is
/// absent or not a directory.
pub async fn project_all(job_cache_dir: &Path, work_dir: &Path) -> Result<(), CacheError> {
    if !is_dir(job_cache_dir).await || !is_dir(work_dir).await {
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(job_cache_dir).await.map_err(crate::error::io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(crate::error::io_err)? {
        let absolute = tokio::fs::canonicalize(entry.path()).await.unwrap_or_else(|_| entry.path());
        let link = work_dir.join(entry.file_name());
        create_symlink(&absolute, &link).await?;
    }
    Ok(())
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_symlink_to_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.txt");
        tokio::fs::write(&target, b"hi").await.unwrap();
        let link = dir.path().join("work").join("frag");

        create_symlink(&target, &link).await.unwrap();

        assert_eq!(tokio::fs::read(&link).await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn existing_symlink_is_left_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.txt");
        tokio::fs::write(&target, b"hi").await.unwrap();
        let other_target = dir.path().join("other.txt");
        tokio::fs::write(&other_target, b"bye").await.unwrap();
        let link = dir.path().join("frag");

        create_symlink(&target, &link).await.unwrap();
        create_symlink(&other_target, &link).await.unwrap();

        assert_eq!(tokio::fs::read(&link).await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn project_all_links_every_child() {
        let cache_dir = tempdir().unwrap();
        tokio::fs::create_dir_all(cache_dir.path().join("m")).await.unwrap();
        tokio::fs::write(cache_dir.path().join("m/inner.txt"), b"x").await.unwrap();
        let work_dir = tempdir().unwrap();

        project_all(cache_dir.path(), work_dir.path()).await.unwrap();

        assert!(work_dir.path().join("m").join("inner.txt").exists());
    }

    #[tokio::test]
    async fn project_all_skips_missing_dirs() {
        let work_dir = tempdir().unwrap();
        project_all(Path::new("/does/not/exist"), work_dir.path()).await.unwrap();
    }
}

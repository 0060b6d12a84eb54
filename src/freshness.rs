//! Compares the remote modification timestamp against the job's recorded
//! timestamp and the local entry's recorded timestamp to decide reuse vs.
//! re-fetch. Called under the entry lock.

use crate::error::CacheError;
use crate::identity::CacheUri;
use crate::registry::CacheStatus;
use crate::remote_fs::{RemoteFs, RemoteStat};

/// `remote_stat` is the caller's pre-fetched stat, if any; otherwise the
/// remote path is stat'd here. An entry that has never been materialized
/// returns `false` immediately, without consulting the remote at all: the
/// `expected_stamp` contract only guards a reused or refreshed entry,
/// never a cold fetch, which simply takes whatever the remote currently
/// holds (the caller records that in [`CacheStatus::mtime`] once the copy
/// completes). A mismatch between the resolved remote timestamp and
/// `expected_stamp` on an already-materialized entry is a fatal
/// [`CacheError::StaleRemoteArtifact`]: the job's own configuration has
/// drifted from the remote, an external contract violation distinct from
/// an ordinary cache miss. A mismatch between the remote timestamp and
/// the entry's recorded `mtime` is normal and just means the entry needs
/// refreshing.
pub async fn is_fresh_and_present(
    entry: &CacheStatus,
    uri: &CacheUri,
    expected_stamp: i64,
    remote_stat: Option<RemoteStat>,
    remote_fs: &dyn RemoteFs,
) -> Result<bool, CacheError> {
    if !entry.materialized {
        return Ok(false);
    }

    let dfs_stamp = match remote_stat {
        Some(stat) => stat.mtime,
        None => remote_fs.stat(&uri.path).await?.mtime,
    };

    if dfs_stamp != expected_stamp {
        tracing::error!(
            uri = %uri.display(),
            expected = expected_stamp,
            found = dfs_stamp,
            "remote artifact changed since job was configured"
        );
        return Err(CacheError::StaleRemoteArtifact {
            uri: uri.display(),
            expected: expected_stamp,
            found: dfs_stamp,
        });
    }

    Ok(dfs_stamp == entry.mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ArtifactKind;
    use crate::remote_fs::NullRemoteFs;
    use std::path::PathBuf;

    fn entry(materialized: bool, mtime: i64) -> CacheStatus {
        CacheStatus {
            local_load_path: PathBuf::from("/tmp/x"),
            kind: ArtifactKind::File,
            materialized,
            refcount: 0,
            mtime,
        }
    }

    #[tokio::test]
    async fn unmaterialized_is_never_fresh_and_never_stats() {
        let remote = NullRemoteFs::new(); // no entries registered, stat would fail
        let uri = CacheUri::parse("dfs://h/a#b").unwrap();
        let e = entry(false, -1);
        let fresh = is_fresh_and_present(&e, &uri, 100, None, &remote).await.unwrap();
        assert!(!fresh);
    }

    #[tokio::test]
    async fn matching_remote_and_entry_is_fresh() {
        let remote = NullRemoteFs::new().with_file("/a", 100, b"x".to_vec());
        let uri = CacheUri::parse("dfs://h/a#b").unwrap();
        let e = entry(true, 100);
        let fresh = is_fresh_and_present(&e, &uri, 100, None, &remote).await.unwrap();
        assert!(fresh);
    }

    #[tokio::test]
    async fn remote_ahead_of_entry_needs_refresh() {
        let remote = NullRemoteFs::new().with_file("/a", 200, b"x".to_vec());
        let uri = CacheUri::parse("dfs://h/a#b").unwrap();
        let e = entry(true, 100);
        let fresh = is_fresh_and_present(&e, &uri, 200, None, &remote).await.unwrap();
        assert!(!fresh);
    }

    #[tokio::test]
    async fn mismatch_against_expected_stamp_is_fatal() {
        let remote = NullRemoteFs::new().with_file("/a", 200, b"x".to_vec());
        let uri = CacheUri::parse("dfs://h/a#b").unwrap();
        let e = entry(true, 100);
        let err = is_fresh_and_present(&e, &uri, 100, None, &remote).await.unwrap_err();
        assert!(matches!(err, CacheError::StaleRemoteArtifact { .. }));
    }
}

use std::fmt;

/// Errors produced by the cache manager.
///
/// Kept as a plain enum, one doc comment per variant, rather than a
/// derive-macro error type: callers match on the variant (in particular
/// [`CacheError::StaleRemoteArtifact`], which is fatal to the job and must
/// never be treated the same as a transient [`CacheError::IoError`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The caller's configuration is invalid: no host could be resolved
    /// for a URI, a URI was malformed, or an expected timestamp was
    /// missing for a listed URI.
    ConfigError(String),
    /// A local or remote filesystem operation failed (stat, copy, mkdir,
    /// delete, extraction).
    IoError(String),
    /// The remote artifact's modification time no longer matches the
    /// timestamp the job recorded when it was configured. Fatal to the
    /// job; never retried.
    StaleRemoteArtifact {
        uri: String,
        expected: i64,
        found: i64,
    },
    /// A refresh was required but the stale entry is still referenced by
    /// at least one live acquirer.
    CacheInUse { cache_id: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "invalid cache configuration: {msg}"),
            Self::IoError(msg) => write!(f, "cache I/O error: {msg}"),
            Self::StaleRemoteArtifact { uri, expected, found } => write!(
                f,
                "remote artifact changed since job was configured: {uri} \
                 (expected mtime {expected}, remote now reports {found})"
            ),
            Self::CacheInUse { cache_id } => {
                write!(f, "cannot refresh cache entry {cache_id}: still in use")
            }
        }
    }
}

impl std::error::Error for CacheError {}

pub(crate) fn io_err(err: std::io::Error) -> CacheError {
    CacheError::IoError(err.to_string())
}

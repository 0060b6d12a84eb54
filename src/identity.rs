//! Canonicalizes a remote URI into a stable `cacheId` and derives the
//! local filesystem path under a base directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Defaults supplied by the job/task configuration store: the name of the
/// cluster's default distributed filesystem, substituted for a URI's host
/// when the URI omits a scheme or a host.
#[derive(Debug, Clone)]
pub struct FsDefaults {
    pub default_host: String,
}

/// A parsed `scheme://host[:port]/absolute/path[#fragment]` artifact URI.
///
/// A missing scheme or host defers to [`FsDefaults::default_host`]; the
/// fragment, when present, names the symlink created in the task's
/// working directory and is never part of the artifact identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheUri {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub fragment: Option<String>,
}

impl CacheUri {
    /// Parses a URI in the format documented on [`CacheUri`].
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        let (body, fragment) = match raw.split_once('#') {
            Some((body, frag)) => (body, Some(frag.to_string())),
            None => (raw, None),
        };

        let (scheme, rest) = match body.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_string()), rest),
            None => (None, body),
        };

        let (authority, path) = if scheme.is_some() {
            match rest.find('/') {
                Some(idx) => (&rest[..idx], &rest[idx..]),
                None => (rest, ""),
            }
        } else {
            ("", rest)
        };

        if path.is_empty() {
            return Err(CacheError::ConfigError(format!(
                "URI {raw} does not contain an absolute path"
            )));
        }
        if !path.starts_with('/') {
            return Err(CacheError::ConfigError(format!(
                "URI {raw} path component must be absolute"
            )));
        }

        let (host, port) = if authority.is_empty() {
            (None, None)
        } else {
            match authority.split_once(':') {
                Some((host, port)) => {
                    let port: u16 = port.parse().map_err(|_| {
                        CacheError::ConfigError(format!("URI {raw} has a malformed port"))
                    })?;
                    (Some(host.to_string()), Some(port))
                }
                None => (Some(authority.to_string()), None),
            }
        };

        Ok(Self { scheme, host, port, path: path.to_string(), fragment })
    }

    /// Reconstructs a display form of the URI, used in error messages.
    pub fn display(&self) -> String {
        let scheme = self.scheme.as_deref().unwrap_or("");
        let host = self.host.as_deref().unwrap_or("");
        let mut out = if scheme.is_empty() {
            self.path.clone()
        } else {
            format!("{scheme}://{host}{}", self.path)
        };
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

/// Derives the canonical registry key for `uri`: `"<host><absolute-path>"`,
/// substituting [`FsDefaults::default_host`] when `uri` omits a host.
///
/// Fails with [`CacheError::ConfigError`] when neither the URI nor the
/// configured defaults yield a host.
pub fn cache_id(uri: &CacheUri, defaults: &FsDefaults) -> Result<String, CacheError> {
    let host = match &uri.host {
        Some(host) if !host.is_empty() => host.clone(),
        _ => {
            if defaults.default_host.is_empty() {
                return Err(CacheError::ConfigError(format!(
                    "no host in {} and no default filesystem host configured",
                    uri.display()
                )));
            }
            defaults.default_host.clone()
        }
    };
    Ok(format!("{host}{}", uri.path))
}

/// Derives the per-entry directory for a `cacheId`: `baseDir/<cacheId>`.
pub fn local_load_path(base_dir: &Path, cache_id: &str) -> PathBuf {
    base_dir.join(cache_id)
}

/// Verifies that every URI in `files` and `archives` carries a non-empty
/// fragment and that fragments are pairwise distinct, case-insensitively,
/// across the union of both slices. Intended to be called before job
/// submission when symlinks are requested. Empty inputs are trivially
/// valid.
pub fn check_uris(files: &[CacheUri], archives: &[CacheUri]) -> bool {
    let mut seen = HashSet::new();
    for uri in files.iter().chain(archives.iter()) {
        let Some(fragment) = &uri.fragment else {
            return false;
        };
        if fragment.is_empty() {
            return false;
        }
        if !seen.insert(fragment.to_lowercase()) {
            return false;
        }
    }
    true
}

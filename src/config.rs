//! A thin, typed view over the job/task framework's string-keyed
//! configuration map. All encoding/decoding of URI lists, timestamp
//! lists, classpath lists, and the symlink flag lives here; everything
//! else in the crate works with the typed values this module produces.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::CacheError;
use crate::identity::CacheUri;
use crate::localizer::DEFAULT_CACHE_SIZE_BYTES;

pub const KEY_CACHE_ARCHIVES: &str = "mapred.cache.archives";
pub const KEY_CACHE_FILES: &str = "mapred.cache.files";
pub const KEY_CACHE_ARCHIVES_TIMESTAMPS: &str = "mapred.cache.archives.timestamps";
pub const KEY_CACHE_FILES_TIMESTAMPS: &str = "mapred.cache.files.timestamps";
pub const KEY_CACHE_LOCAL_ARCHIVES: &str = "mapred.cache.localArchives";
pub const KEY_CACHE_LOCAL_FILES: &str = "mapred.cache.localFiles";
pub const KEY_CLASSPATH_FILES: &str = "mapred.job.classpath.files";
pub const KEY_CLASSPATH_ARCHIVES: &str = "mapred.job.classpath.archives";
pub const KEY_CREATE_SYMLINK: &str = "mapred.create.symlink";
pub const KEY_LOCAL_CACHE_SIZE: &str = "local.cache.size";

/// Typed accessor over a job's string-keyed configuration map. No
/// validation beyond the per-key encoding format documented on each
/// accessor below.
#[derive(Debug, Default, Clone)]
pub struct JobConf {
    map: HashMap<String, String>,
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.map
    }

    fn get_uri_list(&self, key: &str) -> Result<Vec<CacheUri>, CacheError> {
        match self.map.get(key) {
            None => Ok(Vec::new()),
            Some(raw) if raw.is_empty() => Ok(Vec::new()),
            Some(raw) => raw.split(',').map(CacheUri::parse).collect(),
        }
    }

    fn set_uri_list(&mut self, key: &str, uris: &[CacheUri]) {
        let encoded = uris.iter().map(CacheUri::display).collect::<Vec<_>>().join(",");
        self.map.insert(key.to_string(), encoded);
    }

    fn get_timestamp_list(&self, key: &str) -> Result<Vec<i64>, CacheError> {
        match self.map.get(key) {
            None => Ok(Vec::new()),
            Some(raw) if raw.is_empty() => Ok(Vec::new()),
            Some(raw) => raw
                .split(',')
                .map(|s| {
                    s.parse::<i64>()
                        .map_err(|_| CacheError::ConfigError(format!("malformed timestamp: {s}")))
                })
                .collect(),
        }
    }

    fn set_timestamp_list(&mut self, key: &str, timestamps: &[i64]) {
        let encoded = timestamps.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        self.map.insert(key.to_string(), encoded);
    }

    fn get_path_list(&self, key: &str) -> Vec<PathBuf> {
        match self.map.get(key) {
            None => Vec::new(),
            Some(raw) if raw.is_empty() => Vec::new(),
            Some(raw) => raw.split(',').map(PathBuf::from).collect(),
        }
    }

    fn set_path_list(&mut self, key: &str, paths: &[PathBuf]) {
        let encoded =
            paths.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>().join(",");
        self.map.insert(key.to_string(), encoded);
    }

    pub fn cache_archives(&self) -> Result<Vec<CacheUri>, CacheError> {
        self.get_uri_list(KEY_CACHE_ARCHIVES)
    }

    pub fn set_cache_archives(&mut self, uris: &[CacheUri]) {
        self.set_uri_list(KEY_CACHE_ARCHIVES, uris)
    }

    pub fn cache_files(&self) -> Result<Vec<CacheUri>, CacheError> {
        self.get_uri_list(KEY_CACHE_FILES)
    }

    pub fn set_cache_files(&mut self, uris: &[CacheUri]) {
        self.set_uri_list(KEY_CACHE_FILES, uris)
    }

    pub fn cache_archives_timestamps(&self) -> Result<Vec<i64>, CacheError> {
        self.get_timestamp_list(KEY_CACHE_ARCHIVES_TIMESTAMPS)
    }

    pub fn set_cache_archives_timestamps(&mut self, timestamps: &[i64]) {
        self.set_timestamp_list(KEY_CACHE_ARCHIVES_TIMESTAMPS, timestamps)
    }

    pub fn cache_files_timestamps(&self) -> Result<Vec<i64>, CacheError> {
        self.get_timestamp_list(KEY_CACHE_FILES_TIMESTAMPS)
    }

    pub fn set_cache_files_timestamps(&mut self, timestamps: &[i64]) {
        self.set_timestamp_list(KEY_CACHE_FILES_TIMESTAMPS, timestamps)
    }

    pub fn local_cache_archives(&self) -> Vec<PathBuf> {
        self.get_path_list(KEY_CACHE_LOCAL_ARCHIVES)
    }

    pub fn set_local_cache_archives(&mut self, paths: &[PathBuf]) {
        self.set_path_list(KEY_CACHE_LOCAL_ARCHIVES, paths)
    }

    pub fn local_cache_files(&self) -> Vec<PathBuf> {
        self.get_path_list(KEY_CACHE_LOCAL_FILES)
    }

    pub fn set_local_cache_files(&mut self, paths: &[PathBuf]) {
        self.set_path_list(KEY_CACHE_LOCAL_FILES, paths)
    }

    /// Classpath lists are joined with the host OS's path-list separator
    /// (`:` on Unix, `;` on Windows), via [`std::env::join_paths`]/
    /// [`std::env::split_paths`] rather than a hardcoded delimiter.
    pub fn classpath_files(&self) -> Vec<PathBuf> {
        self.get_classpath(KEY_CLASSPATH_FILES)
    }

    pub fn set_classpath_files(&mut self, paths: &[PathBuf]) -> Result<(), CacheError> {
        self.set_classpath(KEY_CLASSPATH_FILES, paths)
    }

    pub fn classpath_archives(&self) -> Vec<PathBuf> {
        self.get_classpath(KEY_CLASSPATH_ARCHIVES)
    }

    pub fn set_classpath_archives(&mut self, paths: &[PathBuf]) -> Result<(), CacheError> {
        self.set_classpath(KEY_CLASSPATH_ARCHIVES, paths)
    }

    fn get_classpath(&self, key: &str) -> Vec<PathBuf> {
        match self.map.get(key) {
            None => Vec::new(),
            Some(raw) if raw.is_empty() => Vec::new(),
            Some(raw) => std::env::split_paths(raw).collect(),
        }
    }

    fn set_classpath(&mut self, key: &str, paths: &[PathBuf]) -> Result<(), CacheError> {
        let joined = std::env::join_paths(paths)
            .map_err(|e| CacheError::ConfigError(format!("classpath entry is invalid: {e}")))?;
        self.map.insert(key.to_string(), joined.to_string_lossy().into_owned());
        Ok(())
    }

    /// `"yes"` enables symlinking; any other value (including absence)
    /// disables it.
    pub fn symlinks_enabled(&self) -> bool {
        self.map.get(KEY_CREATE_SYMLINK).map(|v| v == "yes").unwrap_or(false)
    }

    pub fn set_symlinks_enabled(&mut self, enabled: bool) {
        self.map.insert(KEY_CREATE_SYMLINK.to_string(), if enabled { "yes" } else { "no" }.to_string());
    }

    /// Decimal byte budget for the base directory; defaults to
    /// [`DEFAULT_CACHE_SIZE_BYTES`] when unset or malformed.
    pub fn local_cache_size(&self) -> u64 {
        self.map
            .get(KEY_LOCAL_CACHE_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE_BYTES)
    }

    pub fn set_local_cache_size(&mut self, bytes: u64) {
        self.map.insert(KEY_LOCAL_CACHE_SIZE.to_string(), bytes.to_string());
    }
}

/// Node-level settings that live outside the per-job configuration map:
/// where the cache lives on disk and how verbosely it logs. Loaded once
/// at process start from an optional TOML file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NodeSettings {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub cache_size_bytes: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub default_fs_host: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeSettings {
    pub fn from_toml(raw: &str) -> Result<Self, CacheError> {
        toml::from_str(raw).map_err(|e| CacheError::ConfigError(format!("invalid node settings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cache_files() {
        let mut conf = JobConf::new();
        let uris = vec![CacheUri::parse("dfs://h/a#a").unwrap(), CacheUri::parse("dfs://h/b#b").unwrap()];
        conf.set_cache_files(&uris);
        assert_eq!(conf.cache_files().unwrap(), uris);
    }

    #[test]
    fn round_trips_cache_archives() {
        let mut conf = JobConf::new();
        let uris = vec![CacheUri::parse("dfs://h/a.zip#a").unwrap()];
        conf.set_cache_archives(&uris);
        assert_eq!(conf.cache_archives().unwrap(), uris);
    }

    #[test]
    fn round_trips_timestamps() {
        let mut conf = JobConf::new();
        conf.set_cache_files_timestamps(&[100, 200]);
        assert_eq!(conf.cache_files_timestamps().unwrap(), vec![100, 200]);
    }

    #[test]
    fn round_trips_local_paths() {
        let mut conf = JobConf::new();
        let paths = vec![PathBuf::from("/a/b"), PathBuf::from("/c/d")];
        conf.set_local_cache_files(&paths);
        assert_eq!(conf.local_cache_files(), paths);
    }

    #[test]
    fn symlink_flag_defaults_to_disabled() {
        let conf = JobConf::new();
        assert!(!conf.symlinks_enabled());
    }

    #[test]
    fn symlink_flag_round_trips() {
        let mut conf = JobConf::new();
        conf.set_symlinks_enabled(true);
        assert!(conf.symlinks_enabled());
    }

    #[test]
    fn local_cache_size_has_documented_default() {
        let conf = JobConf::new();
        assert_eq!(conf.local_cache_size(), 1_048_576);
    }

    #[test]
    fn loads_node_settings_from_toml() {
        let settings = NodeSettings::from_toml(
            r#"
            base_dir = "/var/lib/localizer-cache"
            cache_size_bytes = 10485760
            "#,
        )
        .unwrap();
        assert_eq!(settings.base_dir, PathBuf::from("/var/lib/localizer-cache"));
        assert_eq!(settings.cache_size_bytes, Some(10_485_760));
        assert_eq!(settings.log_level, "info");
    }
}

//! localizer-cache - a node-local distributed file localization cache.
//!
//! Given a set of read-only artifacts (plain files and archives) residing
//! in a remote distributed filesystem, materializes them on the local
//! node so that tasks can read them from a local path. Artifacts are
//! shared across tasks, fetched at most once per logical identity,
//! reference-counted while in use, and garbage-collected when a
//! configured local-disk budget is exceeded.
//!
//! The remote filesystem ([`remote_fs::RemoteFs`]) and the zip/jar
//! extractors ([`extractor::ArchiveExtractor`]) are external
//! collaborators, specified only by the trait the core consumes; task
//! scheduling, security, and durable metadata across process restarts
//! are out of scope.

pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod extractor;
pub mod freshness;
pub mod identity;
pub mod localizer;
pub mod registry;
pub mod remote_fs;
pub mod sweeper;
pub mod symlink;

pub use cache::DistributedCache;
pub use error::CacheError;
pub use identity::{cache_id, check_uris, CacheUri, FsDefaults};
pub use registry::{ArtifactKind, CacheStatus, Registry};
pub use remote_fs::{LocalFs, NullRemoteFs, RemoteFs, RemoteStat};
pub use extractor::{ArchiveExtractor, UnsupportedExtractor};

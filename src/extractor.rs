//! The zip/jar archive extractors, an external collaborator invoked as an
//! opaque operation. [`Localizer`](crate::localizer::Localizer) dispatches
//! on the lowercase file extension and calls through this trait; it never
//! inspects archive contents itself.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CacheError;

/// Expands an archive file into a destination directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts a `.jar` archive at `archive` into `dest_dir`.
    async fn extract_jar(&self, archive: &Path, dest_dir: &Path) -> Result<(), CacheError>;

    /// Extracts a `.zip` archive at `archive` into `dest_dir`.
    async fn extract_zip(&self, archive: &Path, dest_dir: &Path) -> Result<(), CacheError>;
}

/// An [`ArchiveExtractor`] that refuses every extraction. Useful as a
/// placeholder where no real zip/jar backend has been wired in yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedExtractor;

#[async_trait]
impl ArchiveExtractor for UnsupportedExtractor {
    async fn extract_jar(&self, _archive: &Path, _dest_dir: &Path) -> Result<(), CacheError> {
        Err(CacheError::IoError("no jar extractor configured".to_string()))
    }

    async fn extract_zip(&self, _archive: &Path, _dest_dir: &Path) -> Result<(), CacheError> {
        Err(CacheError::IoError("no zip extractor configured".to_string()))
    }
}

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error opening archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("unreadable archive container: {0}")]
    Unreadable(String),
}

/// The archive plugin registry: maps a filename suffix to an archive
/// container format (zip, tar, ...), the way `archive_plugin_from_suffix`
/// does in the reference implementation.
pub trait ArchiveRegistry: Send + Sync {
    /// Whether `suffix` (the substring after the last `.`, lowercase) names
    /// a registered archive container format.
    fn is_archive(&self, suffix: &str) -> bool;

    /// Open the container at `fs_path` for streaming enumeration.
    fn open(&self, fs_path: &Path) -> Result<Box<dyn ArchiveSource>, ArchiveError>;
}

/// A streaming enumeration of one open archive's interior paths.
///
/// Implementations must not buffer the whole container in memory: each
/// call to `scan_next` advances the underlying reader by one entry. The
/// archive handle closes when the `ArchiveSource` is dropped.
pub trait ArchiveSource: Send {
    /// The next interior path, '/'-separated and relative to the archive
    /// root, or `None` once the container is exhausted.
    fn scan_next(&mut self) -> Option<String>;
}

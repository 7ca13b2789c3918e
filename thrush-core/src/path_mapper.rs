use std::path::{Path, PathBuf};

/// Translates between logical database paths (UTF-8, rooted at the music
/// directory) and OS filesystem paths.
///
/// This crate targets platforms whose OS path encoding is UTF-8-compatible,
/// so `decode_listing` degrades to a UTF-8 validation of the raw entry name.
/// The contract is written generally so a future charset-aware
/// implementation (e.g. one consulting a configured filesystem charset) can
/// replace it without changing any caller.
#[derive(Debug, Clone)]
pub struct PathMapper {
    music_root: PathBuf,
}

impl PathMapper {
    pub fn new(music_root: impl Into<PathBuf>) -> Self {
        Self { music_root: music_root.into() }
    }

    pub fn music_root(&self) -> &Path {
        &self.music_root
    }

    /// OS path of a directory given its logical path (empty string for root).
    pub fn dir_fs_path(&self, logical_path: &str) -> Option<PathBuf> {
        if logical_path.is_empty() {
            Some(self.music_root.clone())
        } else {
            Some(self.music_root.join(logical_path))
        }
    }

    /// OS path of a named child of a directory at `parent_logical_path`.
    pub fn child_fs_path(&self, parent_logical_path: &str, utf8_name: &str) -> Option<PathBuf> {
        self.dir_fs_path(parent_logical_path).map(|base| base.join(utf8_name))
    }

    /// Converts a raw directory-entry name to UTF-8, or `None` on failure.
    pub fn decode_listing(&self, raw_name: &std::ffi::OsStr) -> Option<String> {
        raw_name.to_str().map(str::to_owned)
    }
}

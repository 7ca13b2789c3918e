use chrono::{DateTime, Utc};

use crate::directory::DirectoryId;

/// Decoded tag metadata. Opaque to the database updater core — it is
/// produced and interpreted entirely by a `DecoderRegistry` implementation
/// and never inspected here.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagBlob(pub Vec<u8>);

impl std::fmt::Debug for TagBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TagBlob").field(&format_args!("{} bytes", self.0.len())).finish()
    }
}

/// One playable item discovered under a recognized decoder suffix.
///
/// A `Song`'s `parent` is a non-owning lookup key, never used to free the
/// directory; ownership flows the other way, from `Directory::songs`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Song {
    pub parent: DirectoryId,
    pub basename: String,
    pub mtime: DateTime<Utc>,
    pub tags: TagBlob,
}

impl Song {
    pub fn new(parent: DirectoryId, basename: impl Into<String>, mtime: DateTime<Utc>, tags: TagBlob) -> Self {
        Self {
            parent,
            basename: basename.into(),
            mtime,
            tags,
        }
    }

    /// URI used in log lines and reported to external observers (playlist,
    /// idle bus). Distinct from the filesystem path: it is the logical path
    /// rooted at the music directory.
    pub fn logical_path(&self, parent_path: &str) -> String {
        if parent_path.is_empty() {
            self.basename.clone()
        } else {
            format!("{parent_path}/{}", self.basename)
        }
    }
}

use crate::song::Song;

/// Reserved `(device, inode)` stand-in for virtual (archive-interior)
/// directories. Guaranteed never to equal a value `stat()` can return.
pub const ARCHIVE_DEVICE_SENTINEL: u64 = u64::MAX;

/// Index of a [`Directory`] within the arena owned by `thrush_core::Tree`.
///
/// Arena indices make the parent-pointer tree cycle-free by construction:
/// a `Directory` cannot accidentally hold a strong reference to an
/// ancestor, because it holds an index, not a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectoryId(pub u32);

impl DirectoryId {
    pub const ROOT: DirectoryId = DirectoryId(0);
}

/// `(device, inode)` pair recorded the last time this directory was
/// `stat()`-ed, or the archive sentinel for virtual directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirStat {
    pub device: u64,
    pub inode: u64,
}

impl DirStat {
    pub fn is_archive_sentinel(&self) -> bool {
        self.device == ARCHIVE_DEVICE_SENTINEL
    }

    /// Sentinel stat for a virtual (archive-interior) directory. The
    /// container's mtime (seconds since the epoch) rides in `inode`, which
    /// real directories use for the genuine inode number and virtual ones
    /// otherwise leave unused — this is how a rescan detects a changed
    /// archive without a dedicated field.
    pub fn archive_sentinel(container_mtime_unix_secs: i64) -> Self {
        Self { device: ARCHIVE_DEVICE_SENTINEL, inode: container_mtime_unix_secs as u64 }
    }

    pub fn archive_mtime_unix_secs(&self) -> i64 {
        self.inode as i64
    }
}

/// An interior node of the music library tree.
///
/// Child directories and songs are kept in separate ordered `Vec`s, but
/// name uniqueness is enforced across their union (invariant 2 of the data
/// model): a basename may label at most one child, directory or song.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Directory {
    pub id: DirectoryId,
    pub parent: Option<DirectoryId>,
    /// Empty for the root; unique within `parent` otherwise.
    pub basename: String,
    /// Logical path cached for logging, rooted at the music directory.
    pub path: String,
    pub children: Vec<DirectoryId>,
    pub songs: Vec<Song>,
    pub stat: Option<DirStat>,
    /// Set when this directory represents the interior of an archive
    /// container rather than a real filesystem directory.
    pub is_virtual: bool,
}

impl Directory {
    pub fn new_root() -> Self {
        Self {
            id: DirectoryId::ROOT,
            parent: None,
            basename: String::new(),
            path: String::new(),
            children: Vec::new(),
            songs: Vec::new(),
            stat: None,
            is_virtual: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.path)
        }
    }

    /// `true` once `stat` has been populated, or the directory is virtual
    /// (virtual directories are never subjected to `stat()`, per invariant 7).
    pub fn stat_populated(&self) -> bool {
        self.stat.is_some()
    }

    pub fn song_index(&self, name: &str) -> Option<usize> {
        self.songs.iter().position(|s| s.basename == name)
    }

    pub fn song(&self, name: &str) -> Option<&Song> {
        self.song_index(name).map(|i| &self.songs[i])
    }
}

//! In-memory fakes for every collaborator trait, gated behind the
//! `testing` feature so `thrush-core` can exercise the end-to-end
//! scenarios in its test suite without a real decoder, archive reader, or
//! playlist.

use std::path::Path;
use std::time::SystemTime;

use parking_lot::Mutex;
use thrush_model::{Directory, Song};

use crate::archive::{ArchiveError, ArchiveRegistry, ArchiveSource};
use crate::decoder::{DecoderError, DecoderRegistry};
use crate::idle::IdleBus;
use crate::persist::{PersistError, PersistStore};
use crate::playlist::Playlist;

/// Decodes any file whose suffix is in its allow-list (`flac`, `ogg`, `mp3`
/// by default) and "loads tags" by hashing the file's current mtime into
/// an opaque blob, so a changed mtime produces a different tag payload.
#[derive(Debug)]
pub struct FakeDecoderRegistry {
    pub suffixes: Vec<String>,
}

impl Default for FakeDecoderRegistry {
    fn default() -> Self {
        Self {
            suffixes: vec!["flac".into(), "ogg".into(), "mp3".into()],
        }
    }
}

impl DecoderRegistry for FakeDecoderRegistry {
    fn is_decodable(&self, suffix: &str) -> bool {
        self.suffixes.iter().any(|s| s.eq_ignore_ascii_case(suffix))
    }

    fn load_tags(&self, fs_path: &Path) -> Result<thrush_model::TagBlob, DecoderError> {
        let meta = std::fs::metadata(fs_path)?;
        let mtime = meta
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Ok(thrush_model::TagBlob(mtime.as_nanos().to_le_bytes().to_vec()))
    }
}

/// Recognizes `suffix` (when set) as an archive container whose interior
/// listing is the fixed `entries` vector. Leave `suffix` as `None` to make
/// this registry match nothing.
#[derive(Debug, Default)]
pub struct FakeArchiveRegistry {
    pub suffix: Option<String>,
    pub entries: Vec<String>,
}

impl ArchiveRegistry for FakeArchiveRegistry {
    fn is_archive(&self, suffix: &str) -> bool {
        self.suffix.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(suffix))
    }

    fn open(&self, _fs_path: &Path) -> Result<Box<dyn ArchiveSource>, ArchiveError> {
        Ok(Box::new(FakeArchiveSource {
            remaining: self.entries.clone().into_iter(),
        }))
    }
}

pub struct FakeArchiveSource {
    remaining: std::vec::IntoIter<String>,
}

impl ArchiveSource for FakeArchiveSource {
    fn scan_next(&mut self) -> Option<String> {
        self.remaining.next()
    }
}

/// Records every snapshot it was asked to save, in call order.
#[derive(Debug, Default)]
pub struct FakePersistStore {
    pub saves: Mutex<Vec<Vec<Directory>>>,
}

impl PersistStore for FakePersistStore {
    fn save(&self, directories: &[Directory]) -> Result<(), PersistError> {
        self.saves.lock().push(directories.to_vec());
        Ok(())
    }
}

impl FakePersistStore {
    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }
}

/// Tracks "live" songs by basename + parent id; `remove_song` detaches
/// them, matching the contract that a playlist must fully release a song
/// reference before the broker's ack.
#[derive(Debug, Default)]
pub struct FakePlaylist {
    pub live: Mutex<Vec<Song>>,
    pub version: Mutex<u64>,
}

impl FakePlaylist {
    pub fn enqueue(&self, song: Song) {
        self.live.lock().push(song);
    }

    pub fn contains(&self, parent: thrush_model::DirectoryId, basename: &str) -> bool {
        self.live
            .lock()
            .iter()
            .any(|s| s.parent == parent && s.basename == basename)
    }

    pub fn version(&self) -> u64 {
        *self.version.lock()
    }
}

impl Playlist for FakePlaylist {
    fn remove_song(&self, song: &Song) {
        self.live
            .lock()
            .retain(|s| !(s.parent == song.parent && s.basename == song.basename));
    }

    fn bump_version(&self) {
        *self.version.lock() += 1;
    }
}

/// Counts how many times the database-changed notification fired.
#[derive(Debug, Default)]
pub struct FakeIdleBus {
    pub notifications: Mutex<u64>,
}

impl FakeIdleBus {
    pub fn notification_count(&self) -> u64 {
        *self.notifications.lock()
    }
}

impl IdleBus for FakeIdleBus {
    fn notify_database_changed(&self) {
        *self.notifications.lock() += 1;
    }
}

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thrush_contracts::{ArchiveRegistry, DecoderRegistry};
use thrush_model::{DirStat, DirectoryId, Song};

use crate::cycle_guard::{CycleGuard, CycleResult};
use crate::delete_broker::DeleteBroker;
use crate::error::UpdateError;
use crate::path_mapper::PathMapper;
use crate::symlink_policy::SymlinkPolicy;
use crate::tree::Tree;
use crate::tree_mutator::TreeMutator;

/// Result of classifying a regular file's suffix against the registered
/// plugins. A first-class match arm rather than an `else if`, so the
/// archive branch can be gated by `#[cfg(feature = "archive")]` as a whole
/// arm instead of straddling a partial condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuffixKind {
    Decodable,
    #[cfg(feature = "archive")]
    Archive,
    Unknown,
}

/// Recursive directory walk that diffs the filesystem against the tree,
/// invokes archive expansion on recognized containers, and applies
/// `TreeMutator` operations along the way.
///
/// Collaborators are held as `Arc<dyn Trait>` rather than borrowed
/// references so a whole scanner can be handed to the spawned scanner
/// thread for the lifetime of one `UpdateJob`.
#[derive(Clone)]
pub struct DirectoryScanner {
    pub mapper: PathMapper,
    pub symlink_policy: SymlinkPolicy,
    pub decoder: Arc<dyn DecoderRegistry>,
    pub archive_registry: Option<Arc<dyn ArchiveRegistry>>,
    pub archive_support: bool,
}

impl DirectoryScanner {
    /// Scans `dir`, recursing into subdirectories. Returns `false` if `dir`
    /// itself could no longer be opened, in which case the caller (the
    /// parent scan or `UpdateJob`) removes it from the tree.
    pub fn scan_directory(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        dir: DirectoryId,
        depth: usize,
    ) -> bool {
        let Some(fs_path) = self.mapper.dir_fs_path(&tree.get(dir).path) else {
            let error = UpdateError::PathMapping { path: tree.get(dir).path.clone() };
            tracing::debug!(error = %error, "unable to resolve directory");
            return false;
        };

        if !tree.get(dir).is_virtual {
            let metadata = match std::fs::metadata(&fs_path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    let error = UpdateError::io(tree.get(dir).path.clone(), err);
                    tracing::debug!(error = %error, "unable to stat directory");
                    return false;
                }
            };
            tree.get_mut(dir).stat = Some(dir_stat(&metadata));
        }

        let read_dir = match open_directory(&tree.get(dir).path, &fs_path) {
            Ok(rd) => rd,
            Err(err) => {
                tracing::debug!(error = %err, "unable to open directory");
                return false;
            }
        };

        self.prune(tree, broker, modified, dir);

        for entry in read_dir {
            let Ok(entry) = entry else { continue };
            self.visit_entry(tree, broker, modified, dir, depth, &entry);
        }

        true
    }

    /// Prune phase: drop any tree child (directory or song) whose backing
    /// filesystem path no longer resolves the way the tree expects.
    fn prune(&self, tree: &mut Tree, broker: &DeleteBroker, modified: &mut bool, dir: DirectoryId) {
        let child_dirs = tree.get(dir).children.clone();
        for child in child_dirs {
            if tree.get(child).is_virtual {
                // Virtual subtrees never touch a real fs_path; their
                // existence tracks their archive container and is managed
                // solely by update_archive_file's own mtime check.
                continue;
            }
            let name = tree.get(child).basename.clone();
            let still_exists = self
                .mapper
                .child_fs_path(&tree.get(dir).path, &name)
                .map(|p| p.is_dir())
                .unwrap_or(false);
            if !still_exists {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.clear_directory(child);
                mutator.remove_child_dir(dir, child);
                tracing::info!(path = %tree.get(dir).child_path(&name), "removing directory");
            }
        }

        let song_names: Vec<String> = tree.get(dir).songs.iter().map(|s| s.basename.clone()).collect();
        for name in song_names {
            let still_exists = self
                .mapper
                .child_fs_path(&tree.get(dir).path, &name)
                .map(|p| p.is_file())
                .unwrap_or(false);
            if !still_exists {
                let uri = tree.get(dir).child_path(&name);
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.remove_song(dir, &name);
                tracing::info!(path = %uri, "removing");
            }
        }
    }

    fn visit_entry(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        dir: DirectoryId,
        depth: usize,
        entry: &std::fs::DirEntry,
    ) {
        let raw_name = entry.file_name();
        if raw_name == "." || raw_name == ".." {
            return;
        }

        let name = match decode_entry_name(&self.mapper, &tree.get(dir).path, &raw_name) {
            Ok(name) => name,
            Err(err) => {
                tracing::debug!(error = %err, "skipping entry with undecodable name");
                return;
            }
        };
        if name.contains('\n') {
            tracing::debug!(name = %name, "skipping entry with embedded newline");
            return;
        }

        let entry_path = entry.path();
        if let Ok(file_type) = entry.file_type() {
            if file_type.is_symlink() {
                let target = std::fs::read_link(&entry_path);
                if !self.symlink_policy.permits_readlink_result(&target, depth) {
                    tracing::debug!(name = %name, "skipping disallowed symlink");
                    return;
                }
            }
        }

        let Ok(metadata) = std::fs::metadata(&entry_path) else {
            // Disappeared between readdir and stat: treat exactly like prune.
            let mut mutator = TreeMutator::new(tree, broker, modified);
            mutator.remove_song(dir, &name);
            return;
        };

        if metadata.is_file() {
            self.update_regular_file(tree, broker, modified, dir, &name, &entry_path, &metadata);
        } else if metadata.is_dir() {
            let candidate_stat = dir_stat(&metadata);
            if CycleGuard::check(tree, &self.mapper, dir, candidate_stat) == CycleResult::Cycle {
                tracing::debug!(name = %name, "recursive directory found");
                return;
            }

            let child = {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.ensure_child_dir(dir, &name)
            };
            if !self.scan_directory(tree, broker, modified, child, depth + 1) {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.clear_directory(child);
                mutator.remove_child_dir(dir, child);
            }
        } else {
            tracing::debug!(name = %name, "skipping non-regular, non-directory entry");
        }
    }

    pub(crate) fn update_regular_file(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        dir: DirectoryId,
        name: &str,
        fs_path: &Path,
        metadata: &std::fs::Metadata,
    ) {
        let suffix = name.rfind('.').map(|i| name[i + 1..].to_ascii_lowercase()).unwrap_or_default();

        match self.classify_suffix(&suffix) {
            SuffixKind::Decodable => self.update_decodable_file(tree, broker, modified, dir, name, fs_path, metadata),
            #[cfg(feature = "archive")]
            SuffixKind::Archive => self.update_archive_file(tree, broker, modified, dir, name, fs_path, metadata),
            SuffixKind::Unknown => {}
        }
    }

    fn classify_suffix(&self, suffix: &str) -> SuffixKind {
        if self.decoder.is_decodable(suffix) {
            return SuffixKind::Decodable;
        }
        #[cfg(feature = "archive")]
        if self.archive_support {
            if let Some(registry) = self.archive_registry.as_ref() {
                if registry.is_archive(suffix) {
                    return SuffixKind::Archive;
                }
            }
        }
        SuffixKind::Unknown
    }

    fn update_decodable_file(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        dir: DirectoryId,
        name: &str,
        fs_path: &Path,
        metadata: &std::fs::Metadata,
    ) {
        let disk_mtime = mtime_of(metadata);
        let uri = tree.get(dir).child_path(name);

        match tree.get(dir).song_index(name) {
            None => match self.decoder.load_tags(fs_path) {
                Ok(tags) => {
                    let song = Song::new(dir, name, disk_mtime, tags);
                    let mut mutator = TreeMutator::new(tree, broker, modified);
                    mutator.add_song(dir, song);
                    tracing::info!(path = %uri, "added");
                }
                Err(err) => {
                    let error = song_load_error(&uri, err);
                    tracing::warn!(path = %uri, error = %error, "unable to load tags for new song");
                }
            },
            Some(_) => {
                let stored_mtime = tree.get(dir).song(name).map(|s| s.mtime);
                if stored_mtime == Some(disk_mtime) {
                    return;
                }
                match self.decoder.load_tags(fs_path) {
                    Ok(tags) => {
                        let song = Song::new(dir, name, disk_mtime, tags);
                        let mut mutator = TreeMutator::new(tree, broker, modified);
                        mutator.refresh_song(dir, name, song);
                        tracing::info!(path = %uri, "updating");
                    }
                    Err(err) => {
                        let error = song_refresh_error(&uri, err);
                        tracing::warn!(path = %uri, error = %error, "unable to refresh tags, removing song");
                        let mut mutator = TreeMutator::new(tree, broker, modified);
                        mutator.remove_song(dir, name);
                    }
                }
            }
        }
    }

    /// Re-synchronizes the virtual subtree rooted at the archive container
    /// `name`. Cheap no-op when the container's mtime matches what was
    /// recorded last scan; otherwise tears the whole subtree down and
    /// rebuilds it from a fresh enumeration, the same granularity the
    /// reference model re-syncs at.
    #[cfg(feature = "archive")]
    fn update_archive_file(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        dir: DirectoryId,
        name: &str,
        fs_path: &Path,
        metadata: &std::fs::Metadata,
    ) {
        let Some(registry) = self.archive_registry.as_ref() else { return };
        let uri = tree.get(dir).child_path(name);
        let disk_mtime = mtime_of(metadata).timestamp();

        if let Some(existing) = tree.find_child_dir(dir, name) {
            let unchanged = tree.get(existing).stat.map(|s| s.archive_mtime_unix_secs()) == Some(disk_mtime);
            if unchanged {
                return;
            }
            let mut mutator = TreeMutator::new(tree, broker, modified);
            mutator.clear_directory(existing);
            mutator.remove_child_dir(dir, existing);
            tracing::debug!(path = %uri, "archive container changed, rebuilding");
        }

        let mut source = match registry.open(fs_path) {
            Ok(source) => source,
            Err(err) => {
                let error = archive_open_error(&uri, err);
                tracing::warn!(path = %uri, error = %error, "unable to open archive");
                return;
            }
        };
        tracing::debug!(path = %uri, "archive opened");

        let archive_dir = {
            let mut mutator = TreeMutator::new(tree, broker, modified);
            mutator.ensure_child_dir(dir, name)
        };
        tree.get_mut(archive_dir).is_virtual = true;
        tree.get_mut(archive_dir).stat = Some(DirStat::archive_sentinel(disk_mtime));

        while let Some(interior_path) = source.scan_next() {
            self.add_archive_entry(tree, broker, modified, archive_dir, &interior_path);
        }
    }

    /// Descends through virtual subdirectories implied by `interior_path`'s
    /// components, creating them as needed, and adds the leaf as a song if
    /// it is not already present. Archive interiors are additive-only: a
    /// previously-seen leaf is never removed or refreshed here; stale
    /// entries are resynchronized by re-scanning the whole archive when its
    /// outer mtime changes (handled by the regular prune/update path on the
    /// archive file itself).
    #[cfg(feature = "archive")]
    fn add_archive_entry(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        archive_dir: DirectoryId,
        interior_path: &str,
    ) {
        let mut components: Vec<&str> = interior_path.split('/').filter(|c| !c.is_empty()).collect();
        let Some(leaf) = components.pop() else { return };

        let mut current = archive_dir;
        for component in components {
            let mut mutator = TreeMutator::new(tree, broker, modified);
            current = mutator.ensure_child_dir(current, component);
            tree.get_mut(current).is_virtual = true;
        }

        if tree.get(current).song_index(leaf).is_some() {
            return;
        }
        let song = Song::new(current, leaf, Utc::now(), thrush_model::TagBlob(Vec::new()));
        let mut mutator = TreeMutator::new(tree, broker, modified);
        mutator.add_song(current, song);
    }
}

pub(crate) fn dir_stat(metadata: &std::fs::Metadata) -> DirStat {
    use std::os::unix::fs::MetadataExt;
    DirStat { device: metadata.dev(), inode: metadata.ino() }
}

fn mtime_of(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

fn open_directory(dir_path: &str, fs_path: &Path) -> crate::error::Result<std::fs::ReadDir> {
    std::fs::read_dir(fs_path).map_err(|err| UpdateError::io(dir_path, err))
}

fn decode_entry_name(mapper: &PathMapper, dir_path: &str, raw_name: &std::ffi::OsStr) -> crate::error::Result<String> {
    mapper.decode_listing(raw_name).ok_or_else(|| {
        let lossy = raw_name.to_string_lossy();
        let path = if dir_path.is_empty() { lossy.into_owned() } else { format!("{dir_path}/{lossy}") };
        UpdateError::CharsetDecode { path }
    })
}

fn song_load_error(path: &str, source: thrush_contracts::DecoderError) -> UpdateError {
    UpdateError::SongLoad { path: path.to_string(), source }
}

fn song_refresh_error(path: &str, source: thrush_contracts::DecoderError) -> UpdateError {
    UpdateError::SongRefresh { path: path.to_string(), source }
}

#[cfg(feature = "archive")]
fn archive_open_error(path: &str, source: thrush_contracts::ArchiveError) -> UpdateError {
    UpdateError::ArchiveOpen { path: path.to_string(), source }
}

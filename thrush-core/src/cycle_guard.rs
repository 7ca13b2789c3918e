use std::os::unix::fs::MetadataExt;

use thrush_model::{DirStat, DirectoryId};

use crate::path_mapper::PathMapper;
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    Clear,
    Cycle,
}

/// Detects directory cycles by comparing a candidate subdirectory's
/// `(device, inode)` against every ancestor on the current traversal path.
///
/// Ancestors missing a populated `stat` are stat-ed lazily and cached on
/// the tree node, so the cost of walking the chain is paid once per
/// ancestor over the lifetime of a scan, not once per descendant.
///
/// Archive-virtual directories never trigger a false cycle: their `device`
/// is the reserved archive sentinel, which cannot equal a value `stat()`
/// returns, so they simply never match a real candidate.
pub struct CycleGuard;

impl CycleGuard {
    pub fn check(tree: &mut Tree, mapper: &PathMapper, parent: DirectoryId, candidate: DirStat) -> CycleResult {
        let mut ancestors = Vec::new();
        let mut current = Some(parent);
        while let Some(id) = current {
            ancestors.push(id);
            current = tree.get(id).parent;
        }

        for id in ancestors {
            if !tree.get(id).stat_populated() {
                if let Some(stat) = stat_directory(tree, mapper, id) {
                    tree.get_mut(id).stat = Some(stat);
                } else {
                    continue;
                }
            }

            if let Some(stat) = tree.get(id).stat {
                if stat == candidate {
                    return CycleResult::Cycle;
                }
            }
        }

        CycleResult::Clear
    }
}

fn stat_directory(tree: &Tree, mapper: &PathMapper, id: DirectoryId) -> Option<DirStat> {
    let dir = tree.get(id);
    if dir.is_virtual {
        return None;
    }
    let fs_path = mapper.dir_fs_path(&dir.path)?;
    let metadata = std::fs::metadata(fs_path).ok()?;
    Some(DirStat { device: metadata.dev(), inode: metadata.ino() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrush_model::DirectoryId;

    #[test]
    fn clear_when_candidate_matches_no_ancestor() {
        let mut tree = Tree::new();
        let a = tree.ensure_child_dir(DirectoryId::ROOT, "a");
        tree.get_mut(DirectoryId::ROOT).stat = Some(DirStat { device: 1, inode: 1 });
        tree.get_mut(a).stat = Some(DirStat { device: 1, inode: 2 });

        let mapper = PathMapper::new("/nonexistent-music-root");
        let candidate = DirStat { device: 1, inode: 3 };
        assert_eq!(CycleGuard::check(&mut tree, &mapper, a, candidate), CycleResult::Clear);
    }

    #[test]
    fn cycle_when_candidate_matches_ancestor() {
        let mut tree = Tree::new();
        let a = tree.ensure_child_dir(DirectoryId::ROOT, "a");
        tree.get_mut(DirectoryId::ROOT).stat = Some(DirStat { device: 1, inode: 1 });
        tree.get_mut(a).stat = Some(DirStat { device: 1, inode: 2 });

        let mapper = PathMapper::new("/nonexistent-music-root");
        let candidate = DirStat { device: 1, inode: 1 };
        assert_eq!(CycleGuard::check(&mut tree, &mapper, a, candidate), CycleResult::Cycle);
    }

    #[test]
    fn virtual_ancestor_with_sentinel_never_matches_real_candidate() {
        let mut tree = Tree::new();
        let archive = tree.ensure_child_dir(DirectoryId::ROOT, "music.zip");
        tree.get_mut(archive).is_virtual = true;
        tree.get_mut(archive).stat = Some(DirStat { device: thrush_model::ARCHIVE_DEVICE_SENTINEL, inode: 0 });
        let inner = tree.ensure_child_dir(archive, "disc1");

        let mapper = PathMapper::new("/nonexistent-music-root");
        let candidate = DirStat { device: thrush_model::ARCHIVE_DEVICE_SENTINEL, inode: 0 };
        // A real directory can never produce the sentinel as its own stat,
        // so this exercises only that the comparison itself is sound.
        assert_eq!(CycleGuard::check(&mut tree, &mapper, inner, candidate), CycleResult::Cycle);
    }
}

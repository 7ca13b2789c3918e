use thrush_model::{Directory, DirectoryId};

/// Arena-indexed parent-pointer tree of [`Directory`] nodes.
///
/// Directories reference each other by [`DirectoryId`], an index into
/// `nodes`, rather than by owning pointer. A node therefore cannot hold a
/// strong reference to an ancestor, which makes cycles impossible by
/// construction — no cycle-collection or weak-reference machinery is
/// needed anywhere in this crate.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Directory>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: vec![Directory::new_root()] }
    }

    pub fn get(&self, id: DirectoryId) -> &Directory {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: DirectoryId) -> &mut Directory {
        &mut self.nodes[id.0 as usize]
    }

    pub fn try_get(&self, id: DirectoryId) -> Option<&Directory> {
        self.nodes.get(id.0 as usize)
    }

    /// The full in-memory arena, for [`thrush_contracts::PersistStore::save`].
    pub fn directories(&self) -> &[Directory] {
        &self.nodes
    }

    /// Ancestors of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: DirectoryId) -> impl Iterator<Item = &Directory> {
        let mut current = self.get(id).parent;
        std::iter::from_fn(move || {
            let id = current?;
            let dir = self.get(id);
            current = dir.parent;
            Some(dir)
        })
    }

    /// Existing child directory named `name` under `parent`, if any.
    pub fn find_child_dir(&self, parent: DirectoryId, name: &str) -> Option<DirectoryId> {
        self.get(parent).children.iter().copied().find(|&c| self.get(c).basename == name)
    }

    /// Returns the existing child directory named `name`, or creates one.
    pub fn ensure_child_dir(&mut self, parent: DirectoryId, name: &str) -> DirectoryId {
        if let Some(existing) = self.find_child_dir(parent, name) {
            return existing;
        }

        let id = DirectoryId(self.nodes.len() as u32);
        let path = self.get(parent).child_path(name);
        self.nodes.push(Directory {
            id,
            parent: Some(parent),
            basename: name.to_string(),
            path,
            children: Vec::new(),
            songs: Vec::new(),
            stat: None,
            is_virtual: false,
        });
        self.get_mut(parent).children.push(id);
        id
    }

    /// Detaches `child` from `parent`'s child list. The node itself is left
    /// in the arena (tombstoned) — arena slots are never reused within one
    /// `Tree`'s lifetime, so stale `DirectoryId`s from before a removal are
    /// simply unreachable from root rather than dangling.
    pub fn detach_child_dir(&mut self, parent: DirectoryId, child: DirectoryId) {
        self.get_mut(parent).children.retain(|&c| c != child);
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

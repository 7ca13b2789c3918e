use thrush_model::{DirectoryId, Song};

use crate::delete_broker::DeleteBroker;
use crate::tree::Tree;

/// Mutation primitives over the in-memory tree, scoped to one running job.
///
/// Every mutation sets the job's `modified` flag. Song removal is never
/// performed directly on the tree — it always routes through
/// [`DeleteBroker`], which is the only path that may shrink a directory's
/// song list.
pub struct TreeMutator<'a> {
    tree: &'a mut Tree,
    broker: &'a DeleteBroker,
    modified: &'a mut bool,
}

impl<'a> TreeMutator<'a> {
    pub fn new(tree: &'a mut Tree, broker: &'a DeleteBroker, modified: &'a mut bool) -> Self {
        Self { tree, broker, modified }
    }

    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// Idempotent: returns the existing child or creates one, marking
    /// `modified` only on creation.
    pub fn ensure_child_dir(&mut self, parent: DirectoryId, name: &str) -> DirectoryId {
        let existed = self.tree.find_child_dir(parent, name).is_some();
        let id = self.tree.ensure_child_dir(parent, name);
        if !existed {
            *self.modified = true;
        }
        id
    }

    pub fn add_song(&mut self, dir: DirectoryId, song: Song) {
        self.tree.get_mut(dir).songs.push(song);
        *self.modified = true;
    }

    pub fn refresh_song(&mut self, dir: DirectoryId, name: &str, song: Song) {
        if let Some(existing) = self.tree.get_mut(dir).songs.iter_mut().find(|s| s.basename == name) {
            *existing = song;
            *self.modified = true;
        }
    }

    /// Detaches the named song and routes it through the delete broker.
    /// No-op if no song with that name exists.
    pub fn remove_song(&mut self, dir: DirectoryId, name: &str) {
        let Some(index) = self.tree.get(dir).song_index(name) else { return };
        let song = self.tree.get_mut(dir).songs.remove(index);
        *self.modified = true;
        self.broker.request_delete(song);
    }

    /// Recursively clears `dir`'s grandchildren, removes every song via
    /// the delete protocol one at a time, then drops the now-empty child
    /// directories. The scanner must not structurally remove `dir` itself
    /// until this returns — every song it ever held has been acknowledged.
    pub fn clear_directory(&mut self, dir: DirectoryId) {
        let children = self.tree.get(dir).children.clone();
        for child in children {
            self.clear_directory(child);
            self.tree.detach_child_dir(dir, child);
            *self.modified = true;
        }

        let song_names: Vec<String> = self.tree.get(dir).songs.iter().map(|s| s.basename.clone()).collect();
        for name in song_names {
            self.remove_song(dir, &name);
        }
    }

    /// Removes `dir` from `parent`'s children. `dir` must already be
    /// empty — call `clear_directory` first.
    pub fn remove_child_dir(&mut self, parent: DirectoryId, dir: DirectoryId) {
        debug_assert!(self.tree.get(dir).children.is_empty(), "remove_child_dir requires an emptied subtree");
        debug_assert!(self.tree.get(dir).songs.is_empty(), "remove_child_dir requires an emptied subtree");
        self.tree.detach_child_dir(parent, dir);
        *self.modified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bridge;
    use thrush_model::{DirectoryId, TagBlob};

    fn song(name: &str) -> Song {
        Song::new(DirectoryId::ROOT, name, chrono::Utc::now(), TagBlob(vec![]))
    }

    fn spawn_autoack(broker: std::sync::Arc<DeleteBroker>, rx: crate::event_bridge::EventReceiver) {
        std::thread::spawn(move || {
            while let Some(thrush_model::UpdateEvent::DeleteRequest(_)) = rx.recv() {
                broker.acknowledge();
            }
        });
    }

    #[test]
    fn add_song_sets_modified() {
        let (tx, _rx) = event_bridge::channel();
        let broker = DeleteBroker::new(tx);
        let mut tree = Tree::new();
        let mut modified = false;
        let mut mutator = TreeMutator::new(&mut tree, &broker, &mut modified);
        mutator.add_song(DirectoryId::ROOT, song("a.flac"));
        assert!(modified);
    }

    #[test]
    fn ensure_child_dir_only_marks_modified_once() {
        let (tx, _rx) = event_bridge::channel();
        let broker = DeleteBroker::new(tx);
        let mut tree = Tree::new();
        let mut modified = false;
        {
            let mut mutator = TreeMutator::new(&mut tree, &broker, &mut modified);
            mutator.ensure_child_dir(DirectoryId::ROOT, "a");
        }
        assert!(modified);

        let mut modified_again = false;
        let mut mutator = TreeMutator::new(&mut tree, &broker, &mut modified_again);
        mutator.ensure_child_dir(DirectoryId::ROOT, "a");
        assert!(!modified_again);
    }

    #[test]
    fn remove_song_routes_through_broker() {
        let (tx, rx) = event_bridge::channel();
        let broker = std::sync::Arc::new(DeleteBroker::new(tx));
        spawn_autoack(broker.clone(), rx);

        let mut tree = Tree::new();
        tree.get_mut(DirectoryId::ROOT).songs.push(song("a.flac"));
        let mut modified = false;
        let mut mutator = TreeMutator::new(&mut tree, &broker, &mut modified);
        mutator.remove_song(DirectoryId::ROOT, "a.flac");

        assert!(modified);
        assert!(tree.get(DirectoryId::ROOT).song("a.flac").is_none());
    }

    #[test]
    fn clear_directory_empties_subtree_before_removal() {
        let (tx, rx) = event_bridge::channel();
        let broker = std::sync::Arc::new(DeleteBroker::new(tx));
        spawn_autoack(broker.clone(), rx);

        let mut tree = Tree::new();
        let a = tree.ensure_child_dir(DirectoryId::ROOT, "a");
        let b = tree.ensure_child_dir(a, "b");
        tree.get_mut(b).songs.push(song("x.flac"));
        tree.get_mut(a).songs.push(song("y.flac"));

        let mut modified = false;
        {
            let mut mutator = TreeMutator::new(&mut tree, &broker, &mut modified);
            mutator.clear_directory(a);
            mutator.remove_child_dir(DirectoryId::ROOT, a);
        }

        assert!(modified);
        assert!(tree.get(DirectoryId::ROOT).children.is_empty());
    }
}

use std::sync::Arc;

use thrush_contracts::PersistStore;
use thrush_model::{DirectoryId, JobId, JobOutcome, UpdateEvent};

use crate::cycle_guard::{CycleGuard, CycleResult};
use crate::delete_broker::DeleteBroker;
use crate::event_bridge::EventSender;
use crate::scanner::{DirectoryScanner, dir_stat};
use crate::tree::Tree;
use crate::tree_mutator::TreeMutator;

/// One unit of work: either a full-root scan or a subpath scan. Invokes
/// `DirectoryScanner`, triggers persistence on completion, and reports its
/// outcome to the service thread. Never touches the playlist or idle bus
/// directly — those are the service thread's responsibility once it
/// observes `JobOutcome::modified`.
///
/// Owns its collaborators as `Arc<dyn Trait>` (via `DirectoryScanner`) and
/// `persist` so the whole job can move into the spawned scanner thread.
pub struct UpdateJob {
    pub job_id: JobId,
    /// `None` scans the whole root; `Some(path)` scans one subpath.
    pub path: Option<String>,
    pub scanner: DirectoryScanner,
    pub persist: Arc<dyn PersistStore>,
    pub events: EventSender,
}

impl UpdateJob {
    pub fn run(self, tree: &mut Tree, broker: &DeleteBroker) -> JobOutcome {
        let mut modified = false;

        match &self.path {
            None => {
                self.scanner.scan_directory(tree, broker, &mut modified, DirectoryId::ROOT, 0);
            }
            Some(path) => {
                if let Some(parent) = self.ensure_ancestors(tree, broker, &mut modified, path) {
                    self.scan_leaf(tree, broker, &mut modified, parent, path);
                }
            }
        }

        if modified {
            if let Err(err) = self.persist.save(tree.directories()) {
                tracing::warn!(error = %err, "failed to persist updated tree");
            }
        }

        let outcome = JobOutcome { job_id: self.job_id, modified };
        self.events.send(UpdateEvent::JobFinished(outcome));
        outcome
    }

    /// Walks `path`'s components (excluding the leaf) from root, ensuring
    /// each exists as a tree directory and running the cycle guard along
    /// the way; deletes any song that collides with an ancestor's name.
    /// Returns the id of the path's immediate parent directory, or `None`
    /// if the job should abort quietly — an ancestor's stat failed or a
    /// cycle was detected partway through.
    fn ensure_ancestors(
        &self,
        tree: &mut Tree,
        broker: &DeleteBroker,
        modified: &mut bool,
        path: &str,
    ) -> Option<DirectoryId> {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if components.pop().is_none() {
            return Some(DirectoryId::ROOT);
        }

        let mut current = DirectoryId::ROOT;
        for component in components {
            {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.remove_song(current, component);
            }

            let fs_path = self.scanner.mapper.child_fs_path(&tree.get(current).path, component)?;
            let metadata = std::fs::metadata(&fs_path).ok()?;
            if !metadata.is_dir() {
                return None;
            }

            let candidate_stat = dir_stat(&metadata);
            if CycleGuard::check(tree, &self.scanner.mapper, current, candidate_stat) == CycleResult::Cycle {
                return None;
            }

            current = {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.ensure_child_dir(current, component)
            };
            tree.get_mut(current).stat = Some(candidate_stat);
        }

        Some(current)
    }

    /// Stats the leaf named by the last component of `path`. If it exists,
    /// descends the scanner into it (or updates it as a regular file); if
    /// it no longer exists, removes whatever name collided with it from
    /// `parent`.
    fn scan_leaf(&self, tree: &mut Tree, broker: &DeleteBroker, modified: &mut bool, parent: DirectoryId, path: &str) {
        let leaf_name = path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(path);
        let Some(fs_path) = self.scanner.mapper.child_fs_path(&tree.get(parent).path, leaf_name) else {
            return;
        };

        match std::fs::metadata(&fs_path) {
            Ok(metadata) if metadata.is_dir() => {
                let candidate_stat = dir_stat(&metadata);
                if CycleGuard::check(tree, &self.scanner.mapper, parent, candidate_stat) == CycleResult::Cycle {
                    return;
                }
                let child = {
                    let mut mutator = TreeMutator::new(tree, broker, modified);
                    mutator.ensure_child_dir(parent, leaf_name)
                };
                let depth = path.split('/').filter(|c| !c.is_empty()).count();
                if !self.scanner.scan_directory(tree, broker, modified, child, depth) {
                    let mut mutator = TreeMutator::new(tree, broker, modified);
                    mutator.clear_directory(child);
                    mutator.remove_child_dir(parent, child);
                }
            }
            Ok(metadata) if metadata.is_file() => {
                self.scanner.update_regular_file(tree, broker, modified, parent, leaf_name, &fs_path, &metadata);
            }
            _ => {
                let mut mutator = TreeMutator::new(tree, broker, modified);
                mutator.remove_song(parent, leaf_name);
                if let Some(child) = tree.find_child_dir(parent, leaf_name) {
                    mutator.clear_directory(child);
                    mutator.remove_child_dir(parent, child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bridge;
    use crate::path_mapper::PathMapper;
    use crate::symlink_policy::SymlinkPolicy;
    use thrush_contracts::testing::{FakeArchiveRegistry, FakeDecoderRegistry, FakePersistStore};

    fn spawn_autoack(broker: Arc<DeleteBroker>, rx: event_bridge::EventReceiver) {
        std::thread::spawn(move || {
            while let Some(UpdateEvent::DeleteRequest(_)) = rx.recv() {
                broker.acknowledge();
            }
        });
    }

    #[test]
    fn root_job_persists_when_modified() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.flac"), b"fake-audio").unwrap();

        let mapper = PathMapper::new(dir.path());
        let decoder = Arc::new(FakeDecoderRegistry::default());
        let archive = Arc::new(FakeArchiveRegistry::default());
        let persist = Arc::new(FakePersistStore::default());
        let (tx, rx) = event_bridge::channel();
        let (job_tx, job_rx) = event_bridge::channel();
        let broker = Arc::new(DeleteBroker::new(tx));
        spawn_autoack(broker.clone(), rx);
        drop(job_rx);

        let scanner = DirectoryScanner {
            mapper,
            symlink_policy: SymlinkPolicy::new(true, true),
            decoder,
            archive_registry: Some(archive),
            archive_support: true,
        };
        let job =
            UpdateJob { job_id: JobId::new(1), path: None, scanner, persist: persist.clone(), events: job_tx };

        let mut tree = Tree::new();
        let outcome = job.run(&mut tree, &broker);
        assert!(outcome.modified);
        assert_eq!(persist.save_count(), 1);
    }

    #[test]
    fn subpath_job_removes_disappeared_leaf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/b.flac"), b"fake-audio").unwrap();

        let mapper = PathMapper::new(dir.path());
        let decoder = Arc::new(FakeDecoderRegistry::default());
        let archive = Arc::new(FakeArchiveRegistry::default());
        let persist = Arc::new(FakePersistStore::default());
        let (tx, rx) = event_bridge::channel();
        let broker = Arc::new(DeleteBroker::new(tx));
        spawn_autoack(broker.clone(), rx);

        let mut tree = Tree::new();
        {
            let scanner = DirectoryScanner {
                mapper: mapper.clone(),
                symlink_policy: SymlinkPolicy::new(true, true),
                decoder: decoder.clone(),
                archive_registry: Some(archive.clone()),
                archive_support: true,
            };
            let (tx2, _) = event_bridge::channel();
            let job =
                UpdateJob { job_id: JobId::new(1), path: None, scanner, persist: persist.clone(), events: tx2 };
            job.run(&mut tree, &broker);
        }
        let a = tree.find_child_dir(DirectoryId::ROOT, "a").unwrap();
        assert!(tree.get(a).song("b.flac").is_some());

        std::fs::remove_file(dir.path().join("a/b.flac")).unwrap();
        let scanner = DirectoryScanner {
            mapper,
            symlink_policy: SymlinkPolicy::new(true, true),
            decoder,
            archive_registry: Some(archive),
            archive_support: true,
        };
        let (tx2, _) = event_bridge::channel();
        let job = UpdateJob {
            job_id: JobId::new(2),
            path: Some("a/b.flac".to_string()),
            scanner,
            persist,
            events: tx2,
        };
        job.run(&mut tree, &broker);
        let a = tree.find_child_dir(DirectoryId::ROOT, "a").unwrap();
        assert!(tree.get(a).song("b.flac").is_none());
    }
}

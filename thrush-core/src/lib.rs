//! Database updater core of a music player daemon: reconciles an
//! in-memory, persistent music library against the current state of a
//! music directory on the filesystem.
//!
//! The crate's public surface is deliberately small: [`UpdateCore`] is the
//! process-wide singleton a server builds once at startup and threads
//! through its command dispatch, exposing the four operations in the
//! external-interface command surface. Everything else (`DirectoryScanner`,
//! `TreeMutator`, `DeleteBroker`, ...) is internal machinery.

mod cycle_guard;
mod delete_broker;
pub mod error;
mod event_bridge;
mod path_mapper;
mod queue;
mod scanner;
mod symlink_policy;
mod tree;
mod tree_mutator;
mod update_job;

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use thrush_config::UpdateConfig;
use thrush_contracts::{ArchiveRegistry, DecoderRegistry, IdleBus, PersistStore, Playlist};
use thrush_model::UpdateEvent;

pub use error::{Result, UpdateError};

use delete_broker::DeleteBroker;
use event_bridge::EventReceiver;
use path_mapper::PathMapper;
use queue::UpdateQueue;
use scanner::DirectoryScanner;
use symlink_policy::SymlinkPolicy;
use tree::Tree;

/// The process-wide singleton: the update queue, the tree it mutates, the
/// delete-broker handshake, and the collaborators it was built with.
/// Constructed once at startup, not a module-level static, so every
/// integration test can build its own instance over a fresh
/// `tempfile::TempDir`.
pub struct UpdateCore {
    service_thread: ThreadId,
    queue: UpdateQueue,
    broker: Arc<DeleteBroker>,
    events: EventReceiver,
    playlist: Arc<dyn Playlist>,
    idle_bus: Arc<dyn IdleBus>,
    initialized: bool,
}

impl UpdateCore {
    pub fn new(
        config: &UpdateConfig,
        decoder: Arc<dyn DecoderRegistry>,
        archive_registry: Option<Arc<dyn ArchiveRegistry>>,
        persist: Arc<dyn PersistStore>,
        playlist: Arc<dyn Playlist>,
        idle_bus: Arc<dyn IdleBus>,
    ) -> Self {
        let mapper = PathMapper::new(config.music_directory.clone());
        let symlink_policy = SymlinkPolicy::new(config.follow_inside_symlinks, config.follow_outside_symlinks);
        let scanner = DirectoryScanner {
            mapper,
            symlink_policy,
            decoder,
            archive_registry,
            archive_support: config.archive_support,
        };

        let (tx, rx) = event_bridge::channel();
        let broker = Arc::new(DeleteBroker::new(tx.clone()));
        let tree = Arc::new(Mutex::new(Tree::new()));
        let queue = UpdateQueue::new(tree, broker.clone(), scanner, persist, tx, config.pending_queue_capacity);

        Self {
            service_thread: thread::current().id(),
            queue,
            broker,
            events: rx,
            playlist,
            idle_bus,
            initialized: false,
        }
    }

    /// Initializes notifiers and registers event handlers. Must be called
    /// once, on the service thread, before the first `directory_update_init`.
    pub fn update_global_init(&mut self) {
        self.assert_service_thread();
        debug_assert!(!self.initialized, "update_global_init called twice");
        tracing::info!("update core initialized");
        self.initialized = true;
    }

    /// Releases notifier resources. Must be called after the last active
    /// job has finished.
    pub fn update_global_finish(&mut self) {
        self.assert_service_thread();
        debug_assert!(self.queue.is_updating().is_none(), "update_global_finish called with a job still active");
        tracing::info!("update core finished");
        self.initialized = false;
    }

    /// Enqueues or spawns a scan of `path` (`None` scans the whole root).
    /// Returns the assigned job id, or `0` if the pending queue was full.
    pub fn directory_update_init(&mut self, path: Option<String>) -> u32 {
        self.assert_service_thread();
        debug_assert!(self.initialized, "directory_update_init called before update_global_init");
        self.queue.request(path)
    }

    /// The currently active job id, or `0` while idle.
    pub fn is_updating_db(&self) -> u32 {
        self.assert_service_thread();
        self.queue.is_updating().map(|id| id.get()).unwrap_or(0)
    }

    /// Drains every event currently buffered on the bridge without
    /// blocking: acknowledges delete-requests after detaching the song
    /// from the playlist, and hands job-finished outcomes to the queue.
    /// Called by the service thread's own event loop between handling its
    /// other duties.
    pub fn process_events(&mut self) {
        self.assert_service_thread();
        while let Some(event) = self.events.try_recv() {
            self.dispatch(event);
        }
    }

    /// Blocks until the queue returns to idle, processing every event
    /// along the way. Intended for tests driving a scan to completion
    /// deterministically; a real service thread should prefer
    /// `process_events` interleaved with its other work.
    pub fn run_until_idle(&mut self) {
        self.assert_service_thread();
        while self.queue.is_updating().is_some() {
            let Some(event) = self.events.recv() else { break };
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: UpdateEvent) {
        match event {
            UpdateEvent::DeleteRequest(song) => {
                self.playlist.remove_song(&song);
                self.broker.acknowledge();
            }
            UpdateEvent::JobFinished(outcome) => {
                self.queue.handle_job_finished(outcome, self.playlist.as_ref(), self.idle_bus.as_ref());
            }
        }
    }

    fn assert_service_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.service_thread,
            "UpdateCore must only be driven from the service thread"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrush_contracts::testing::{
        FakeArchiveRegistry, FakeDecoderRegistry, FakeIdleBus, FakePersistStore, FakePlaylist,
    };

    fn core(root: &std::path::Path) -> (UpdateCore, Arc<FakePersistStore>, Arc<FakePlaylist>, Arc<FakeIdleBus>) {
        let config = UpdateConfig {
            music_directory: root.to_path_buf(),
            follow_inside_symlinks: true,
            follow_outside_symlinks: true,
            archive_support: true,
            pending_queue_capacity: 32,
        };
        let persist = Arc::new(FakePersistStore::default());
        let playlist = Arc::new(FakePlaylist::default());
        let idle_bus = Arc::new(FakeIdleBus::default());
        let mut core = UpdateCore::new(
            &config,
            Arc::new(FakeDecoderRegistry::default()),
            Some(Arc::new(FakeArchiveRegistry::default())),
            persist.clone(),
            playlist.clone() as Arc<dyn Playlist>,
            idle_bus.clone() as Arc<dyn IdleBus>,
        );
        core.update_global_init();
        (core, persist, playlist, idle_bus)
    }

    #[test]
    fn fresh_add_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/b.flac"), b"fake-audio").unwrap();

        let (mut core, persist, _playlist, idle_bus) = core(dir.path());
        let job_id = core.directory_update_init(None);
        assert_eq!(job_id, 1);
        assert_eq!(core.is_updating_db(), 1);

        core.run_until_idle();

        assert_eq!(core.is_updating_db(), 0);
        assert_eq!(persist.save_count(), 1);
        assert_eq!(idle_bus.notification_count(), 1);
        core.update_global_finish();
    }

    #[test]
    fn job_ids_wrap_never_report_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (mut core, _persist, _playlist, _idle_bus) = core(dir.path());

        for expected in 1..=5u32 {
            let job_id = core.directory_update_init(None);
            assert_eq!(job_id, expected);
            core.run_until_idle();
        }
        core.update_global_finish();
    }
}

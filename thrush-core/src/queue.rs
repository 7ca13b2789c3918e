use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use thrush_contracts::PersistStore;
use thrush_model::{JobId, JobOutcome};

use crate::delete_broker::DeleteBroker;
use crate::event_bridge::EventSender;
use crate::scanner::DirectoryScanner;
use crate::tree::Tree;
use crate::update_job::UpdateJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Idle,
    Running,
    Done,
}

/// Singleton coordinating at-most-one active job, a bounded FIFO of pending
/// paths, assignment of monotonically cycling job identifiers, and the
/// completion handoff.
///
/// All mutating methods assert they run on the service thread via a
/// `ThreadId` captured at construction; the in-memory tree itself is
/// mutated only by the scanner thread that is currently running, enforced
/// here by holding the tree's mutex for the worker's whole lifetime rather
/// than per-mutation — the reference model's bare two-thread discipline
/// made this implicit, Rust requires it spelled out as a lock.
pub struct UpdateQueue {
    service_thread: ThreadId,
    tree: Arc<Mutex<Tree>>,
    broker: Arc<DeleteBroker>,
    scanner: DirectoryScanner,
    persist: Arc<dyn PersistStore>,
    events: EventSender,
    capacity: usize,
    pending: VecDeque<Option<String>>,
    progress: Progress,
    active_job_id: Option<JobId>,
    next_job_id: JobId,
    worker: Option<JoinHandle<()>>,
}

impl UpdateQueue {
    pub fn new(
        tree: Arc<Mutex<Tree>>,
        broker: Arc<DeleteBroker>,
        scanner: DirectoryScanner,
        persist: Arc<dyn PersistStore>,
        events: EventSender,
        capacity: usize,
    ) -> Self {
        Self {
            service_thread: thread::current().id(),
            tree,
            broker,
            scanner,
            persist,
            events,
            capacity,
            pending: VecDeque::new(),
            progress: Progress::Idle,
            active_job_id: None,
            next_job_id: JobId::new(1),
            worker: None,
        }
    }

    /// Enqueues or immediately spawns a scan of `path` (`None` for the
    /// whole root). Returns the job id the caller can watch for, or `0` if
    /// the pending FIFO is full and the request was dropped.
    pub fn request(&mut self, path: Option<String>) -> u32 {
        self.assert_service_thread();

        match self.progress {
            Progress::Idle => {
                let job_id = self.next_job_id;
                self.next_job_id = job_id.next();
                self.active_job_id = Some(job_id);
                self.progress = Progress::Running;
                self.spawn_job(job_id, path);
                job_id.get()
            }
            Progress::Running | Progress::Done => {
                if self.pending.len() >= self.capacity {
                    tracing::warn!("pending update queue full, dropping request");
                    return 0;
                }
                self.pending.push_back(path);
                let offset = self.pending.len() as u32;
                self.active_job_id.expect("active_job_id set while Running or Done").advance(offset).get()
            }
        }
    }

    /// Handles a "job-finished" event observed on the service thread: joins
    /// the worker, triggers persistence side effects, and either starts the
    /// next queued job or returns to idle.
    pub fn handle_job_finished(
        &mut self,
        outcome: JobOutcome,
        playlist: &dyn thrush_contracts::Playlist,
        idle_bus: &dyn thrush_contracts::IdleBus,
    ) {
        self.assert_service_thread();

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        if outcome.modified {
            idle_bus.notify_database_changed();
            playlist.bump_version();
        }

        if let Some(next_path) = self.pending.pop_front() {
            let job_id = self.active_job_id.expect("active_job_id set on job completion").next();
            self.active_job_id = Some(job_id);
            self.progress = Progress::Running;
            self.spawn_job(job_id, next_path);
        } else {
            self.progress = Progress::Idle;
            self.active_job_id = None;
        }
    }

    /// Current job id, or `None` while idle.
    pub fn is_updating(&self) -> Option<JobId> {
        self.assert_service_thread();
        match self.progress {
            Progress::Idle => None,
            Progress::Running | Progress::Done => self.active_job_id,
        }
    }

    fn spawn_job(&mut self, job_id: JobId, path: Option<String>) {
        let tree = self.tree.clone();
        let broker = self.broker.clone();
        let scanner = self.scanner.clone();
        let persist = self.persist.clone();
        let events = self.events.clone();

        let handle = thread::spawn(move || {
            let job = UpdateJob { job_id, path, scanner, persist, events };
            let mut tree = tree.lock();
            job.run(&mut tree, &broker);
        });
        self.worker = Some(handle);
    }

    fn assert_service_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.service_thread,
            "UpdateQueue must only be driven from the service thread"
        );
    }
}

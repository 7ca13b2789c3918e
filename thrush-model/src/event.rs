use crate::job::JobOutcome;
use crate::song::Song;

/// Events lifted from the scanner thread to the service thread by
/// `thrush_core::EventBridge`. These are the only two event kinds the
/// scanner ever emits (see the concurrency model): a request to safely
/// remove a song, and a signal that the active job has finished.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// The scanner has detached `song` from its directory's song list and
    /// is waiting on `thrush_core::DeleteBroker` for an acknowledgment that
    /// every external observer (playlist, etc.) has released it.
    DeleteRequest(Song),
    /// The active job has run to completion.
    JobFinished(JobOutcome),
}

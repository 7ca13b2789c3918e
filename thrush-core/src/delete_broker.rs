use parking_lot::{Condvar, Mutex};
use thrush_model::{Song, UpdateEvent};

use crate::event_bridge::EventSender;

/// Single-slot cross-thread rendezvous that lets the scanner hand a song
/// off to the service thread for safe removal, used exclusively from the
/// scanner thread.
///
/// The protocol: the scanner detaches the song from its directory (so no
/// further traversal can observe it), publishes it here, and blocks until
/// the service thread has detached every external reference (playlist,
/// idle bus) and acknowledged. Only then does the scanner's own copy drop,
/// guaranteeing no live external reference ever outlives the free.
///
/// A collaborator that never releases its reference hangs the scanner
/// forever — intentional, since the alternative is freeing a song a
/// playlist is still iterating.
///
/// `events` is wrapped in its own `Mutex` rather than stored bare: an
/// `mpsc::Sender` is `Send` but not `Sync`, and this struct is shared
/// across the scanner and service threads behind an `Arc`, which requires
/// every field to be `Sync`.
#[derive(Debug)]
pub struct DeleteBroker {
    slot: Mutex<Option<Song>>,
    ack: Condvar,
    events: Mutex<EventSender>,
}

impl DeleteBroker {
    pub fn new(events: EventSender) -> Self {
        Self { slot: Mutex::new(None), ack: Condvar::new(), events: Mutex::new(events) }
    }

    /// Publishes `song` and blocks until the service thread acknowledges.
    /// Scanner-thread-only.
    pub fn request_delete(&self, song: Song) {
        let mut slot = self.slot.lock();
        debug_assert!(slot.is_none(), "delete slot must be empty before a new request");
        *slot = Some(song.clone());
        self.events.lock().send(UpdateEvent::DeleteRequest(song));
        self.ack.wait_while(&mut slot, |occupant| occupant.is_some());
    }

    /// Clears the slot and wakes the waiting scanner. Service-thread-only,
    /// called after the song has been fully detached from the playlist and
    /// every other observer.
    pub fn acknowledge(&self) {
        let mut slot = self.slot.lock();
        *slot = None;
        self.ack.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bridge;
    use std::sync::Arc;
    use std::time::Duration;
    use thrush_model::{DirectoryId, TagBlob};

    fn sample_song() -> Song {
        Song::new(DirectoryId::ROOT, "b.flac", chrono::Utc::now(), TagBlob(vec![1, 2, 3]))
    }

    #[test]
    fn request_delete_blocks_until_acknowledged() {
        let (tx, rx) = event_bridge::channel();
        let broker = Arc::new(DeleteBroker::new(tx));

        let scanner_broker = broker.clone();
        let song = sample_song();
        let handle = std::thread::spawn(move || {
            scanner_broker.request_delete(song);
        });

        // Service thread: observe the delete-request, then acknowledge.
        let event = rx.recv().expect("delete-request event");
        assert!(matches!(event, UpdateEvent::DeleteRequest(_)));

        // Give the scanner thread a moment to reach the wait before acking,
        // to exercise the actual blocking path rather than a race.
        std::thread::sleep(Duration::from_millis(20));
        broker.acknowledge();

        handle.join().expect("scanner thread should return after ack");
    }
}

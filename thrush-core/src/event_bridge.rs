use std::sync::mpsc;

use thrush_model::UpdateEvent;

/// The scanner-thread half of the event channel. Cheap to clone; every
/// `UpdateJob` on the scanner thread holds one.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::Sender<UpdateEvent>);

impl EventSender {
    /// Best-effort: if the service thread's receiver has already been
    /// dropped (process shutting down), the event is silently discarded
    /// rather than panicking the scanner.
    pub fn send(&self, event: UpdateEvent) {
        let _ = self.0.send(event);
    }
}

/// The service-thread half. Not `Clone`: exactly one receiver drains the
/// bridge, per the single-consumer contract in the concurrency model.
#[derive(Debug)]
pub struct EventReceiver(mpsc::Receiver<UpdateEvent>);

impl EventReceiver {
    /// Blocks until an event arrives, or returns `None` once every
    /// `EventSender` has been dropped.
    pub fn recv(&self) -> Option<UpdateEvent> {
        self.0.recv().ok()
    }

    pub fn try_recv(&self) -> Option<UpdateEvent> {
        self.0.try_recv().ok()
    }
}

/// Creates a fresh scanner-to-service event channel carrying
/// delete-request and job-finished events, the only approved cross-thread
/// interaction apart from the `DeleteBroker` ack signal.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (EventSender(tx), EventReceiver(rx))
}

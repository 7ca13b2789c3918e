/// The idle-notification subsystem: wakes clients blocked on `idle`
/// subscriptions once a job has changed the database.
pub trait IdleBus: Send + Sync {
    fn notify_database_changed(&self);
}

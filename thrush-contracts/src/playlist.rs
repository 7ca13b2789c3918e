use thrush_model::Song;

/// The playlist subsystem, as seen by the `DeleteBroker` handshake.
///
/// `remove_song` must fully detach any reference to `song` before
/// returning — the broker frees the song the instant this call (and every
/// other observer's) returns, so a playlist implementation that merely
/// schedules the removal asynchronously would violate invariant 4.
pub trait Playlist: Send + Sync {
    fn remove_song(&self, song: &Song);

    /// Invalidate cached playlist views after a job that mutated the tree.
    fn bump_version(&self);
}

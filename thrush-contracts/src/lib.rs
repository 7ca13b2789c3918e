//! Trait surfaces describing the database updater core's collaborators:
//! the decoder and archive plugin registries, the on-disk persistence
//! store, and the playlist/idle-notification subsystems. Each one is a
//! narrow contract — the core only calls the handful of methods below,
//! never the real subsystem's full API.

pub mod archive;
pub mod decoder;
pub mod idle;
pub mod persist;
pub mod playlist;

#[cfg(feature = "testing")]
pub mod testing;

pub use archive::{ArchiveError, ArchiveRegistry, ArchiveSource};
pub use decoder::{DecoderError, DecoderRegistry};
pub use idle::IdleBus;
pub use persist::{PersistError, PersistStore};
pub use playlist::Playlist;

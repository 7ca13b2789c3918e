use thiserror::Error;
use thrush_model::Directory;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error saving database: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error saving database: {0}")]
    Serialize(String),
}

/// The on-disk database serializer. The core only guarantees that `save`
/// observes the full, consistent set of mutations of one completed job —
/// never a partial traversal state.
///
/// `directories` is the tree's arena, indexed by `DirectoryId`; entry 0 is
/// always the root.
pub trait PersistStore: Send + Sync {
    fn save(&self, directories: &[Directory]) -> Result<(), PersistError>;
}

use std::path::Path;

use thiserror::Error;
use thrush_model::TagBlob;

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("io error reading tags: {0}")]
    Io(#[from] std::io::Error),
    #[error("unreadable tags: {0}")]
    Unreadable(String),
}

/// The decoder plugin registry: maps a filename suffix to a decoder plugin
/// capable of loading tag metadata, the way `decoder_plugin_from_suffix`
/// does in the reference implementation.
pub trait DecoderRegistry: Send + Sync {
    /// Whether `suffix` (the substring after the last `.`, lowercase) names
    /// a registered decoder plugin.
    fn is_decodable(&self, suffix: &str) -> bool;

    /// Load tags for the file at `fs_path`. Called both for a brand new
    /// song and to refresh an existing one whose mtime changed.
    fn load_tags(&self, fs_path: &Path) -> Result<TagBlob, DecoderError>;
}

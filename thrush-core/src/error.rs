use thiserror::Error;

/// Failure kinds the scanner can encounter while walking a directory tree.
///
/// Per the error handling design, almost none of these propagate out of
/// `UpdateJob::run` — they are logged and handled locally so a single bad
/// entry never aborts the rest of a scan. The type exists so internal
/// helpers and their tests have a precise, matchable name for what went
/// wrong instead of only observing the side effect (a skip, a removal).
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem name at {path} is not representable in the charset")]
    CharsetDecode { path: String },

    #[error("logical path {path} cannot be mapped to a filesystem path")]
    PathMapping { path: String },

    #[error("failed to open archive at {path}: {source}")]
    ArchiveOpen {
        path: String,
        #[source]
        source: thrush_contracts::ArchiveError,
    },

    #[error("failed to load tags for {path}: {source}")]
    SongLoad {
        path: String,
        #[source]
        source: thrush_contracts::DecoderError,
    },

    #[error("failed to refresh tags for {path}: {source}")]
    SongRefresh {
        path: String,
        #[source]
        source: thrush_contracts::DecoderError,
    },
}

impl UpdateError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;

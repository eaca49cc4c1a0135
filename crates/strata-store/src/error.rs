use std::io;
use std::path::PathBuf;

use strata_types::ContentError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure on the backing medium.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Raw bytes could not be interpreted by the entry's content type.
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: ContentError,
    },

    /// A value could not be written by its content type.
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: ContentError,
    },

    /// `put` was given a value whose content type differs from the key's.
    #[error("content type mismatch for {key}: value has content type {actual}")]
    ContentTypeMismatch { key: String, actual: String },

    /// A required argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Store configuration could not be loaded.
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// The medium is in a state the store cannot interpret.
    #[error("medium error: {0}")]
    Medium(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

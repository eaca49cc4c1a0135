use std::io;

use strata_types::ContentError;
use thiserror::Error;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode archive entry {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: ContentError,
    },

    #[error("failed to encode archive entry {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: ContentError,
    },

    #[error("content type mismatch for {key}: value has content type {actual}")]
    ContentTypeMismatch { key: String, actual: String },
}

impl From<ArchiveError> for ContentError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Io(e) => ContentError::Io(e),
            ArchiveError::Zip(ZipError::Io(e)) => ContentError::Io(e),
            other => ContentError::malformed("zip", other.to_string()),
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

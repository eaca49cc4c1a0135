use std::io;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("content type already registered for suffix: {0}")]
    DuplicateSuffix(String),
}

/// Errors raised by a codec while converting between bytes and values.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The underlying stream failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The bytes could not be interpreted in this format.
    #[error("malformed {suffix} content: {reason}")]
    Malformed { suffix: String, reason: String },

    /// A value was handed to a codec that cannot represent it.
    #[error("value is not representable as {suffix} content")]
    Mismatch { suffix: String },
}

impl ContentError {
    pub fn malformed(suffix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            suffix: suffix.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used by codecs.
pub type ContentResult<T> = Result<T, ContentError>;

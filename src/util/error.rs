//! Error types for the scene cache library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Missing child, location or channel data
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is not legal for the current mode or node kind
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Bad input: non-monotonic sample time, malformed link, bad name
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Open mode or file extension not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Link / data mutual exclusivity violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Link resolution revisited a (file, root) pair already on the chain
    #[error("Cyclic link: {0}")]
    CyclicLink(String),

    /// Invalid magic bytes at start of file
    #[error("Invalid scene cache file: expected container magic bytes")]
    InvalidMagic,

    /// File was never committed (writer did not close it)
    #[error("Container is not frozen: {0}")]
    NotFrozen(PathBuf),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Type mismatch when reading data
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Sample index out of bounds
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Child index out of bounds
    #[error("Child index {index} out of bounds (count: {count})")]
    ChildOutOfBounds { index: usize, count: usize },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Header metadata could not be parsed
    #[error("Invalid header metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidArgument,
    Unsupported,
    Conflict,
    Io,
    Corrupt,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::SampleOutOfBounds { .. } | Self::ChildOutOfBounds { .. } => ErrorKind::NotFound,
            Self::InvalidState(_) | Self::CyclicLink(_) => ErrorKind::InvalidState,
            Self::InvalidArgument(_) | Self::TypeMismatch { .. } => ErrorKind::InvalidArgument,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Io(_) | Self::MmapFailed(_) => ErrorKind::Io,
            Self::InvalidMagic
            | Self::NotFrozen(_)
            | Self::UnexpectedEof(_)
            | Self::InvalidStructure(_)
            | Self::Utf8(_)
            | Self::Json(_) => ErrorKind::Corrupt,
        }
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid-state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type alias for scene cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::SampleOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::FileNotFound("x.scc".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::CyclicLink("a".into()).kind(), ErrorKind::InvalidState);
        assert_eq!(Error::type_mismatch("Box3d", "String").kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::conflict("tags").kind(), ErrorKind::Conflict);
        assert_eq!(Error::NotFrozen("x.scc".into()).kind(), ErrorKind::Corrupt);
    }
}

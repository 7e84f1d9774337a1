//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// File already exists (for operations that require new files)
    #[display("file already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path is not usable for the requested operation (empty, traversal,
    /// separators inside a single segment, null bytes).
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Every disambiguated variant of a destination was already taken.
    #[display("no free name left for {}", _0.display())]
    Exhausted(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Classify an I/O error, attaching the path it happened on where the
    /// kind alone would be meaningless.
    pub(crate) fn from_io(e: IoError, path: impl Into<PathBuf>) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.into()),
            _ => Self::Io(e),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind as IoKind;
    use std::path::Path;

    #[test]
    fn io_errors_keep_their_path() {
        let kind = ErrorKind::from_io(IoError::from(IoKind::NotFound), "raw_data/M001");
        assert!(matches!(&kind, ErrorKind::NotFound(p) if p == Path::new("raw_data/M001")));
        let kind = ErrorKind::from_io(IoError::from(IoKind::PermissionDenied), "archives");
        assert_eq!(kind.to_string(), "permission denied: archives");
        let kind = ErrorKind::from_io(IoError::from(IoKind::StorageFull), "archives");
        assert!(matches!(kind, ErrorKind::Io(_)));
        assert!(kind.is_retryable());
    }
}

//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. The restructuring and archiving phases have their own,
//! more specific kinds ([`restructure::error`](crate::restructure::error),
//! [`archive::error`](crate::archive::error)) which end up as children of the
//! kinds below.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A subject or session pattern failed to compile.
    #[display("invalid {field} pattern: {pattern}")]
    Pattern { field: &'static str, pattern: String },
    /// A fallback identifier can't be used as a directory name.
    #[display("invalid fallback identifier: {_0:?}")]
    Fallback(#[error(not(source))] String),
    #[display("restructuring failed")]
    Restructure,
    #[display("archiving failed")]
    Archive,
    #[display("project scaffold failed")]
    Scaffold,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

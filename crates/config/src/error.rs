//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configuration file was explicitly requested but isn't there.
    #[display("configuration file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// The merged sources could not be read or don't describe a valid
    /// configuration (wrong types, unknown compression format, bad TOML).
    #[display("invalid configuration")]
    Invalid,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

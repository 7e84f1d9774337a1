//! Error types for the [`restructure`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A restructure error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for restructure operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a restructure failure.
///
/// Everything up to and including [`Discovery`](Self::Discovery) happens
/// before the first file is touched. [`Collision`](Self::Collision) and
/// [`Move`](Self::Move) abort a run part way through; files already moved stay
/// where they are.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source tree is missing, unreadable or not a directory.
    #[display("source directory unusable: {}", _0.display())]
    SourceRoot(#[error(not(source))] PathBuf),
    /// The destination root is missing or not a directory.
    #[display("destination root unusable: {}", _0.display())]
    DestinationRoot(#[error(not(source))] PathBuf),
    /// Part of the source tree could not be listed.
    #[display("could not list source tree under {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    /// No free disambiguated name could be found for a destination.
    #[display("no free destination for {}", path.display())]
    Collision { path: PathBuf },
    /// A file could not be moved to its destination.
    #[display("failed to move {} to {}", from.display(), to.display())]
    Move { from: PathBuf, to: PathBuf },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Move { .. })
    }
}

//! Error types for the [`archive`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an archive failure.
///
/// ### Fatal before any archive is written
/// - [`ErrorKind::DestinationRoot`]
/// - [`ErrorKind::Prepare`]
///
/// ### Per session
/// - [`ErrorKind::Create`], collected into [`ErrorKind::Incomplete`] once
///   every other session has been attempted.
///
/// ### Reading archives back
/// - [`ErrorKind::Read`]
/// - [`ErrorKind::Format`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The project root is missing or not a directory.
    #[display("destination root unusable: {}", _0.display())]
    DestinationRoot(#[error(not(source))] PathBuf),
    /// The archives directory couldn't be created, or `raw_data` couldn't be
    /// listed.
    #[display("could not prepare archiving under {}", _0.display())]
    Prepare(#[error(not(source))] PathBuf),
    /// Writing one session's archive failed. No partial file is left behind.
    #[display("failed to create archive {}", archive.display())]
    Create { archive: PathBuf },
    /// At least one session could not be archived.
    #[display("{} of {attempted} archives failed: {}", failed.len(), list_paths(failed))]
    Incomplete { failed: Vec<PathBuf>, attempted: usize },
    #[display("failed to read archive {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// The archive's contents don't match the compression its name implies.
    #[display("archive content does not match its extension: {}", _0.display())]
    Format(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Incomplete { .. })
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_names_every_failed_archive() {
        let kind = ErrorKind::Incomplete {
            failed: vec![PathBuf::from("archives/B_1.tar.gz"), PathBuf::from("archives/D_1.tar.gz")],
            attempted: 4,
        };
        assert_eq!(kind.to_string(), "2 of 4 archives failed: archives/B_1.tar.gz, archives/D_1.tar.gz");
    }
}

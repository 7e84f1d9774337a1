//! Local filesystem operations.

use crate::error::{ErrorKind, Result};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Upper bound on the disambiguator search in [`free_path`].
pub const MAX_DISAMBIGUATOR: u32 = 100_000;

/// How [`move_file`] got the file to its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Atomic rename on the same device.
    Renamed,
    /// Source and destination are on different devices; the file was copied
    /// and the original removed.
    Copied,
}

/// Returns `true` if anything (file, directory, or even a dangling symlink)
/// occupies `path`.
pub fn exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
        Err(e) => exn::bail!(ErrorKind::from_io(e, path)),
    }
}

/// Inserts `_<n>` between the file stem and its extension.
///
/// Only the final extension counts, and a file without one gets the suffix
/// appended to its name.
///
/// ```
/// use ndos_storage::disambiguate;
/// use std::path::Path;
/// assert_eq!(disambiguate(Path::new("raw/data.csv"), 1), Path::new("raw/data_1.csv"));
/// assert_eq!(disambiguate(Path::new("raw/README"), 2), Path::new("raw/README_2"));
/// assert_eq!(disambiguate(Path::new("raw/scan.tar.gz"), 3), Path::new("raw/scan.tar_3.gz"));
/// ```
#[must_use]
pub fn disambiguate(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.file_stem().unwrap_or_default());
    name.push(format!("_{n}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Returns `candidate` if nothing occupies it, otherwise the first free
/// [`disambiguate`]d variant, scanning upward from `_1`.
///
/// The filesystem is re-checked on every step, nothing is reserved; a
/// concurrent writer could still take the returned path before it is used.
///
/// # Errors
/// [`ErrorKind::Exhausted`] once [`MAX_DISAMBIGUATOR`] variants are taken.
pub fn free_path(candidate: impl AsRef<Path>) -> Result<PathBuf> {
    let candidate = candidate.as_ref();
    if !exists(candidate)? {
        return Ok(candidate.to_path_buf());
    }
    for n in 1..=MAX_DISAMBIGUATOR {
        let attempt = disambiguate(candidate, n);
        if !exists(&attempt)? {
            debug!(candidate = %candidate.display(), free = %attempt.display(), "disambiguated destination");
            return Ok(attempt);
        }
    }
    exn::bail!(ErrorKind::Exhausted(candidate.to_path_buf()))
}

/// Moves the file at `from` to `to`, creating missing parent directories.
///
/// Tries an atomic rename first. When that fails because the paths are on
/// different devices, the file is copied and the original removed. If the copy
/// fails, any partial destination file is removed again; if removing the
/// original fails, both copies are left in place and the error is returned.
#[instrument(level = "debug", skip_all, fields(from = %from.display(), to = %to.display()))]
pub fn move_file(from: &Path, to: &Path) -> Result<Transfer> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ErrorKind::from_io(e, parent))?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(Transfer::Renamed),
        Err(e) if e.kind() == IoErrorKind::CrossesDevices => {
            copy_then_remove(from, to)?;
            Ok(Transfer::Copied)
        },
        Err(e) => exn::bail!(ErrorKind::from_io(e, from)),
    }
}

pub(crate) fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = fs::copy(from, to) {
        // Whatever made it across is unusable.
        _ = fs::remove_file(to);
        exn::bail!(ErrorKind::from_io(e, from));
    }
    fs::remove_file(from).map_err(|e| ErrorKind::from_io(e, from))?;
    Ok(())
}

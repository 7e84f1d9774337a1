//! Moving files from an unstructured source tree into the project layout.
//!
//! A run has two stages. Construction ([`Restructurer::new`]) validates both
//! roots and walks the whole source tree, so a missing or unreadable source
//! fails before anything is touched. Iteration then handles one file per
//! step: classify it, compute its destination, and (unless this is a dry run)
//! move it to the first free name at that destination.
//!
//! The first error ends the run. Files moved before it stay moved.
//!
//! Running twice over the same tree is not idempotent: files already in the
//! layout that are also under the source root get moved again (and pick up a
//! `_N` suffix). The only exception is a destination nested inside the source,
//! whose `raw_data` and `archives` directories are never walked.

pub mod error;

use crate::classify::{Classifier, Placement};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::placement::{ARCHIVES_DIR, RAW_DATA_DIR, resolve_destination};
use crate::restructure::error::{ErrorKind, Result};
use exn::ResultExt;
use ndos_storage::{Transfer, free_path, move_file};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::vec::IntoIter;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// The outcome of handling a single source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Dry run: where the file would go, before collision resolution.
    Planned { from: PathBuf, to: PathBuf, placement: Placement },
    /// The file now lives at `to`, which may carry a `_N` disambiguator.
    Moved { from: PathBuf, to: PathBuf, placement: Placement, transfer: Transfer },
}
impl Action {
    pub fn source(&self) -> &Path {
        match self {
            Self::Planned { from, .. } | Self::Moved { from, .. } => from,
        }
    }

    pub fn destination(&self) -> &Path {
        match self {
            Self::Planned { to, .. } | Self::Moved { to, .. } => to,
        }
    }

    pub fn placement(&self) -> &Placement {
        match self {
            Self::Planned { placement, .. } | Self::Moved { placement, .. } => placement,
        }
    }
}

/// Iterator over the [`Action`]s of one restructuring run.
///
/// Yields one item per discovered file, in file-name order of the source
/// tree. After the first `Err` it yields nothing more.
#[derive(Debug)]
pub struct Restructurer {
    dest_root: PathBuf,
    classifier: Classifier,
    dry_run: bool,
    discovered: usize,
    files: IntoIter<PathBuf>,
    halted: bool,
}

impl Restructurer {
    /// Validates the roots and discovers every source file.
    ///
    /// The destination root doesn't have to exist yet. A live run creates it,
    /// a dry run leaves it alone. If it does exist it must be a directory.
    ///
    /// # Errors
    /// Returns [`Exn<LibraryErrorKind::Restructure>`](LibraryErrorKind::Restructure)
    /// raised from [`SourceRoot`](ErrorKind::SourceRoot),
    /// [`DestinationRoot`](ErrorKind::DestinationRoot) or
    /// [`Discovery`](ErrorKind::Discovery).
    #[instrument(skip_all, fields(src = %src_root.as_ref().display(), dest = %dest_root.as_ref().display(), dry_run = dry_run))]
    pub fn new(
        src_root: impl AsRef<Path>,
        dest_root: impl AsRef<Path>,
        classifier: Classifier,
        dry_run: bool,
    ) -> LibraryResult<Self> {
        Self::new_inner(src_root.as_ref(), dest_root.as_ref(), classifier, dry_run)
            .or_raise(|| LibraryErrorKind::Restructure)
    }

    fn new_inner(src_root: &Path, dest_root: &Path, classifier: Classifier, dry_run: bool) -> Result<Self> {
        let src_root = fs::canonicalize(src_root).or_raise(|| ErrorKind::SourceRoot(src_root.to_path_buf()))?;
        if !src_root.is_dir() {
            exn::bail!(ErrorKind::SourceRoot(src_root));
        }
        let dest_root = absolute_root(dest_root)?;
        let files = discover(&src_root, &dest_root)?;
        if !dry_run {
            fs::create_dir_all(&dest_root).or_raise(|| ErrorKind::DestinationRoot(dest_root.clone()))?;
        }
        info!(count = files.len(), "discovered source files");
        Ok(Self {
            dest_root,
            classifier,
            dry_run,
            discovered: files.len(),
            files: files.into_iter(),
            halted: false,
        })
    }

    /// Number of files found in the source tree.
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    /// The destination root, made absolute.
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    fn process(&self, from: PathBuf) -> Result<Action> {
        let placement = self.classifier.classify(&from);
        let candidate = resolve_destination(&from, &self.dest_root, &placement.subject, &placement.session);
        if self.dry_run {
            info!(from = %from.display(), to = %candidate.display(), "planned");
            return Ok(Action::Planned { from, to: candidate, placement });
        }
        let to = free_path(&candidate).or_raise(|| ErrorKind::Collision { path: candidate.clone() })?;
        let transfer = move_file(&from, &to).or_raise(|| ErrorKind::Move { from: from.clone(), to: to.clone() })?;
        info!(from = %from.display(), to = %to.display(), ?transfer, "moved");
        Ok(Action::Moved { from, to, placement, transfer })
    }
}

impl Iterator for Restructurer {
    type Item = LibraryResult<Action>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let from = self.files.next()?;
        let result = self.process(from).or_raise(|| LibraryErrorKind::Restructure);
        self.halted = result.is_err();
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted { (0, Some(0)) } else { (0, Some(self.files.len())) }
    }
}

/// Runs a whole restructuring pass and returns every [`Action`] taken, in
/// processing order.
///
/// On error, the files handled before the failure are not reported; they are
/// already in place on disk.
pub fn restructure(
    src_root: impl AsRef<Path>,
    dest_root: impl AsRef<Path>,
    classifier: Classifier,
    dry_run: bool,
) -> LibraryResult<Vec<Action>> {
    Restructurer::new(src_root, dest_root, classifier, dry_run)?.collect()
}

fn absolute_root(dest_root: &Path) -> Result<PathBuf> {
    let unusable = || ErrorKind::DestinationRoot(dest_root.to_path_buf());
    match fs::canonicalize(dest_root) {
        Ok(root) if root.is_dir() => Ok(root),
        Ok(_) => exn::bail!(unusable()),
        Err(e) if e.kind() == IoErrorKind::NotFound => std::path::absolute(dest_root).or_raise(unusable),
        Err(e) => Err(e).or_raise(unusable),
    }
}

/// Lists every regular, non-hidden file under `src_root` in file-name order.
///
/// Symlinks are neither followed nor collected. When the destination root
/// lies inside the source tree its layout directories are left out.
fn discover(src_root: &Path, dest_root: &Path) -> Result<Vec<PathBuf>> {
    let excluded = [dest_root.join(RAW_DATA_DIR), dest_root.join(ARCHIVES_DIR)];
    let mut files = vec![];
    let mut walker = WalkDir::new(src_root).min_depth(1).follow_links(false).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(src_root).to_path_buf();
                return Err(e).or_raise(|| ErrorKind::Discovery(path));
            },
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            if excluded.iter().any(|dir| dir == entry.path()) {
                debug!(path = %entry.path().display(), "skipping destination layout inside source tree");
                walker.skip_current_dir();
            }
            continue;
        }
        if !file_type.is_file() {
            debug!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            debug!(path = %entry.path().display(), "skipping hidden file");
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

//! Empty project skeleton.

use crate::error::{ErrorKind, Result};
use crate::placement::RAW_DATA_DIR;
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Top-level directories of a fresh project.
pub const PROJECT_DIRS: [&str; 5] = [RAW_DATA_DIR, "processed_data", "analysis", "figures", "scripts"];
pub const README_FILE: &str = "README.md";
const README: &str = "# N-DOS Project\n\nThis project follows the N-DOS layout.\n";

/// Creates `root` with the standard project directories and a README.
///
/// Existing directories and files are left alone, except that `force`
/// rewrites the README. Returns the paths that were created or rewritten,
/// so running it twice without `force` returns nothing the second time.
#[instrument(skip_all, fields(root = %root.as_ref().display(), force = force))]
pub fn create_project(root: impl AsRef<Path>, force: bool) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut touched = vec![];
    if !root.is_dir() {
        fs::create_dir_all(root).or_raise(|| ErrorKind::Scaffold)?;
        touched.push(root.to_path_buf());
    }
    for dir in PROJECT_DIRS.map(|dir| root.join(dir)) {
        if dir.is_dir() {
            continue;
        }
        fs::create_dir(&dir).or_raise(|| ErrorKind::Scaffold)?;
        debug!(path = %dir.display(), "created directory");
        touched.push(dir);
    }
    let readme = root.join(README_FILE);
    if force || !readme.exists() {
        fs::write(&readme, README).or_raise(|| ErrorKind::Scaffold)?;
        debug!(path = %readme.display(), "wrote readme");
        touched.push(readme);
    }
    Ok(touched)
}

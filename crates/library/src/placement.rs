//! Project layout and destination paths.

use std::path::{Path, PathBuf};

/// Directory under the project root holding restructured files.
pub const RAW_DATA_DIR: &str = "raw_data";
/// Leaf directory inside each `<Subject>/<Session>` that holds the files.
pub const RAW_DIR: &str = "raw";
/// Directory under the project root receiving the per-session archives.
pub const ARCHIVES_DIR: &str = "archives";

/// Computes where `file` belongs: `<dest_root>/raw_data/<subject>/<session>/raw/<file name>`.
///
/// No I/O happens here; the returned path is a candidate that may already be
/// occupied. A `file` without a final name component (`/`, `..`) contributes
/// nothing, leaving the `raw` directory itself.
///
/// ```
/// use ndos_library::resolve_destination;
/// use std::path::Path;
///
/// let dest = resolve_destination(Path::new("/in/sub-M001/20230501_scan.csv"), Path::new("/proj"), "M001", "20230501");
/// assert_eq!(dest, Path::new("/proj/raw_data/M001/20230501/raw/20230501_scan.csv"));
/// ```
#[must_use]
pub fn resolve_destination(file: &Path, dest_root: &Path, subject: &str, session: &str) -> PathBuf {
    let mut path = session_raw_dir(dest_root, subject, session);
    if let Some(name) = file.file_name() {
        path.push(name);
    }
    path
}

/// `<dest_root>/raw_data/<subject>/<session>/raw`
pub(crate) fn session_raw_dir(dest_root: &Path, subject: &str, session: &str) -> PathBuf {
    dest_root.join(RAW_DATA_DIR).join(subject).join(session).join(RAW_DIR)
}

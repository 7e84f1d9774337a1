//! Path validation.
//!
//! Identifiers extracted from file paths end up as directory names. A custom
//! pattern can easily capture something like `a/b` or `..`, which would
//! either add levels to the layout or escape it entirely.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates that `segment` is exactly one normal path component.
///
/// Rejects empty strings, `.` and `..`, anything containing a path separator,
/// and null bytes (which pass through [`Path::components`] on Unix but cause
/// truncation in C-based syscalls).
///
/// # Examples
///
/// ```
/// use ndos_storage::validate_segment;
/// assert_eq!(validate_segment("M001").unwrap(), "M001");
/// assert_eq!(validate_segment("20230501_1").unwrap(), "20230501_1");
/// assert!(validate_segment("sub/M001").is_err());
/// assert!(validate_segment("..").is_err());
/// assert!(validate_segment("").is_err());
/// ```
pub fn validate_segment(segment: &str) -> Result<&str> {
    let invalid = || ErrorKind::InvalidPath(Path::new(segment).to_path_buf());
    if segment.contains('\0') || segment.contains('/') || segment.contains(std::path::MAIN_SEPARATOR) {
        exn::bail!(invalid());
    }
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(s)), None) if s == segment => Ok(segment),
        _ => exn::bail!(invalid()),
    }
}

//! Filesystem primitives used when relocating files into the N-DOS layout.
//!
//! Everything here is synchronous and operates directly on the local
//! filesystem:
//!
//! - [`validate_segment`] checks that a derived identifier can be used as a
//!   single directory name without escaping its parent.
//! - [`free_path`] finds the first unoccupied variant of a destination by
//!   inserting a numeric disambiguator before the extension.
//! - [`move_file`] renames a file into place, falling back to
//!   copy-then-delete when source and destination live on different devices.

pub mod error;
mod fs;
mod path;

pub use crate::fs::{MAX_DISAMBIGUATOR, Transfer, disambiguate, exists, free_path, move_file};
pub use crate::path::validate_segment;

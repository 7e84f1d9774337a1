//! Sorting experiment output into the N-DOS project layout.
//!
//! A run happens in two phases, each its own call:
//!
//! 1. [`restructure`] walks a source tree, derives a Subject and Session for
//!    every file from its path ([`Classifier`]) and moves it to
//!    `<root>/raw_data/<Subject>/<Session>/raw/`.
//! 2. [`archive_all`] bundles each `<Subject>/<Session>/raw` directory into
//!    `<root>/archives/<Subject>_<Session>.tar.gz`.
//!
//! Both phases are also available as iterators ([`Restructurer`],
//! [`Archiver`]) for callers that report progress per item.

pub mod archive;
mod classify;
pub mod error;
mod placement;
pub mod restructure;
pub mod scaffold;

pub use crate::archive::{Archived, Archiver, archive_all, list_members};
pub use crate::classify::{Classifier, Placement, extract};
pub use crate::placement::{ARCHIVES_DIR, RAW_DATA_DIR, RAW_DIR, resolve_destination};
pub use crate::restructure::{Action, Restructurer, restructure};
pub use crate::scaffold::create_project;

//! Compression layer for session archives.
//!
//! A session archive is a tar stream passed through one of the formats below.
//! [`Compression::encoder`] wraps the archive file for writing and
//! [`Compression::wrap_reader`] undoes it for reading. The format of an
//! existing archive can be guessed from its name ([`Compression::from_path`])
//! and confirmed from its first bytes ([`Compression::check_magic_bytes`]).
//!
//! With the `serde` feature a format is read from and written to config files
//! by its short name (`"gzip"`, `"bzip2"`, `"none"`).

mod construct;
pub mod error;
mod ops;
mod util;

pub use crate::ops::Encoder;

/// How the tar stream of an archive is compressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Plain `.tar`.
    None,
    Bzip2,
    /// `.tar.gz`, the layout's standard archive format.
    #[default]
    Gzip,
    #[cfg(feature = "xz")]
    Xz,
    #[cfg(feature = "zstd")]
    Zstd,
}

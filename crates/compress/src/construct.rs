use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
#[cfg(feature = "xz")]
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
#[cfg(feature = "zstd")]
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

const SIGNATURES: &[(&[u8], Compression)] = &[
    (&BZIP2_MAGIC, Compression::Bzip2),
    (&GZIP_MAGIC, Compression::Gzip),
    #[cfg(feature = "xz")]
    (&XZ_MAGIC, Compression::Xz),
    #[cfg(feature = "zstd")]
    (&ZSTD_MAGIC, Compression::Zstd),
];

/// Parses the names accepted on the command line and in config files.
/// Case and surrounding whitespace are ignored; `tar` means uncompressed.
impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "tar" => Ok(Compression::None),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            "gz" | "gzip" => Ok(Compression::Gzip),
            #[cfg(feature = "xz")]
            "xz" | "lzma" => Ok(Compression::Xz),
            #[cfg(not(feature = "xz"))]
            "xz" | "lzma" => exn::bail!(ErrorKind::DisabledFormat(s.to_string())),
            #[cfg(feature = "zstd")]
            "zst" | "zstd" => Ok(Compression::Zstd),
            #[cfg(not(feature = "zstd"))]
            "zst" | "zstd" => exn::bail!(ErrorKind::DisabledFormat(s.to_string())),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}
impl Compression {
    /// Guesses the format of an archive from its name.
    ///
    /// Only the final extension counts: `M001_20230501.tar.gz` is
    /// [`Gzip`](Self::Gzip), `M001_20230501.tar` is [`None`](Self::None), and
    /// the single-extension forms (`.tgz`, `.tbz2`) are understood too.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "bz2" | "tbz2" => Compression::Bzip2,
                "gz" | "tgz" => Compression::Gzip,
                #[cfg(feature = "xz")]
                "xz" | "txz" => Compression::Xz,
                #[cfg(feature = "zstd")]
                "zst" => Compression::Zstd,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    /// Identifies a format by its leading signature. Input that matches no
    /// signature (a plain tar header, or too few bytes) is [`None`](Self::None).
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        SIGNATURES
            .iter()
            .find(|(magic, _)| bytes.starts_with(magic))
            .map_or(Compression::None, |(_, format)| *format)
    }
}

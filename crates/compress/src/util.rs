use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl Compression {
    /// Suffix appended after `.tar` in archive names. Empty for
    /// [`Compression::None`].
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
            #[cfg(feature = "xz")]
            Compression::Xz => ".xz",
            #[cfg(feature = "zstd")]
            Compression::Zstd => ".zst",
        }
    }

    /// Name used in config files and on the command line.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
            #[cfg(feature = "xz")]
            Compression::Xz => "xz",
            #[cfg(feature = "zstd")]
            Compression::Zstd => "zstd",
        }
    }

    /// Whether the leading `bytes` of a file agree with this format.
    /// [`Compression::None`] agrees with anything no other format claims.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        *self == Self::from_magic_bytes(bytes)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use crate::Compression;
    use serde::de::{Deserialize, Deserializer, Error as DeError};
    use serde::ser::{Serialize, Serializer};

    impl Serialize for Compression {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.as_str())
        }
    }

    impl<'de> Deserialize<'de> for Compression {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let name = String::deserialize(deserializer)?;
            name.parse().map_err(|e: crate::error::Error| D::Error::custom(&*e))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[rstest]
    #[case(Compression::None, "")]
    #[case(Compression::Bzip2, ".bz2")]
    #[case(Compression::Gzip, ".gz")]
    #[cfg_attr(feature = "xz", case(Compression::Xz, ".xz"))]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd, ".zst"))]
    fn test_extension(#[case] format: Compression, #[case] expected: &str) {
        assert_eq!(format.extension(), expected);
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    fn test_display_parses_back(#[case] format: Compression) {
        assert_eq!(format.to_string().parse::<Compression>().unwrap(), format);
    }

    #[test]
    fn test_check_magic_bytes() {
        assert!(Compression::Gzip.check_magic_bytes(&[0x1F, 0x8B, 0x08]));
        assert!(!Compression::Gzip.check_magic_bytes(&[0x42, 0x5A, 0x68]));
        assert!(Compression::None.check_magic_bytes(b"plain tar header"));
        assert!(!Compression::None.check_magic_bytes(&[0x1F, 0x8B, 0x08]));
    }
}

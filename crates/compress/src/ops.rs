//! Streaming compression and decompression.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::BzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{self, Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::{read::XzDecoder, write::XzEncoder};
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Highest level each format offers.
const BZIP2_LEVEL: BzCompression = BzCompression::best();
const GZIP_LEVEL: GzCompression = GzCompression::best();
#[cfg(feature = "xz")]
const XZ_LEVEL: u32 = 9;
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 19;

/// A streaming compressor for one of the supported [`Compression`] formats.
///
/// Unlike a boxed writer, the encoder has to be [finished](Self::finish)
/// explicitly: gzip and friends write a trailer on completion, and a failure
/// there means the output is unusable. Dropping an unfinished encoder makes a
/// best-effort attempt and discards any error.
pub enum Encoder<W: Write> {
    None(W),
    Bzip2(BzEncoder<W>),
    Gzip(GzEncoder<W>),
    #[cfg(feature = "xz")]
    Xz(XzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(ZstdEncoder<'static, W>),
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::None(w) => w.write(buf),
            Encoder::Bzip2(w) => w.write(buf),
            Encoder::Gzip(w) => w.write(buf),
            #[cfg(feature = "xz")]
            Encoder::Xz(w) => w.write(buf),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::None(w) => w.flush(),
            Encoder::Bzip2(w) => w.flush(),
            Encoder::Gzip(w) => w.flush(),
            #[cfg(feature = "xz")]
            Encoder::Xz(w) => w.flush(),
            #[cfg(feature = "zstd")]
            Encoder::Zstd(w) => w.flush(),
        }
    }
}

impl<W: Write> Encoder<W> {
    /// Write any trailing data for the format and hand back the inner writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = match self {
            Encoder::None(w) => w,
            Encoder::Bzip2(w) => w.finish().or_raise(|| ErrorKind::Io)?,
            Encoder::Gzip(w) => w.finish().or_raise(|| ErrorKind::Io)?,
            #[cfg(feature = "xz")]
            Encoder::Xz(w) => w.finish().or_raise(|| ErrorKind::Io)?,
            #[cfg(feature = "zstd")]
            Encoder::Zstd(w) => w.finish().or_raise(|| ErrorKind::Io)?,
        };
        inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(inner)
    }
}

impl Compression {
    /// Starts compressing everything written into `writer`.
    ///
    /// ```
    /// use ndos_compress::Compression;
    /// use std::io::Write;
    ///
    /// let mut encoder = Compression::Gzip.encoder(Vec::new()).unwrap();
    /// encoder.write_all(b"M002/20230101/raw/data.csv").unwrap();
    /// let compressed = encoder.finish().unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&compressed), Compression::Gzip);
    /// ```
    #[instrument(skip(writer), fields(format = %self))]
    pub fn encoder<W: Write>(&self, writer: W) -> Result<Encoder<W>> {
        Ok(match self {
            Compression::None => Encoder::None(writer),
            Compression::Bzip2 => Encoder::Bzip2(BzEncoder::new(writer, BZIP2_LEVEL)),
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(writer, GZIP_LEVEL)),
            #[cfg(feature = "xz")]
            Compression::Xz => Encoder::Xz(XzEncoder::new(writer, XZ_LEVEL)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Encoder::Zstd(ZstdEncoder::new(writer, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?),
        })
    }

    /// Decompresses `reader` on the fly, the inverse of [`encoder`](Self::encoder).
    ///
    /// ```
    /// use ndos_compress::Compression;
    /// use std::io::{Read, Write};
    ///
    /// let mut encoder = Compression::Bzip2.encoder(Vec::new()).unwrap();
    /// encoder.write_all(b"trace.npy").unwrap();
    /// let archived = encoder.finish().unwrap();
    ///
    /// let mut contents = String::new();
    /// Compression::Bzip2.wrap_reader(archived.as_slice()).unwrap().read_to_string(&mut contents).unwrap();
    /// assert_eq!(contents, "trace.npy");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }
}

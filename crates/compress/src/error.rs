//! Errors raised while choosing or driving a compression format.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An encoder or decoder couldn't be set up.
    #[display("could not initialise codec")]
    Encoder,
    /// A format name that doesn't correspond to anything known, e.g. `zip`.
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A known format whose cargo feature is switched off in this build.
    #[display("disabled format: {_0}")]
    DisabledFormat(#[error(not(source))] String),
    /// Writing to or finishing a stream failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

//! Command-line error types.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("project setup failed")]
    Init,
    #[display("restructuring aborted")]
    Restructure,
    #[display("archiving failed")]
    Archive,
}

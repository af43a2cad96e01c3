//! Buffer and Channel primitives: a growable contiguous byte container with
//! suffix-append and zero-copy slicing, and the `{Identifier, Connection, Reader,
//! Writer}` bundle that every transport (TCP, or an in-process duplex pair for tests)
//! implements. Everything above this crate -- `beam-http`'s parsers, `beam-client`'s
//! `HttpClient`, `beam-rpc`'s dispatcher -- consumes transports only through the
//! [`channel::Channel`] trait object boundary, never a concrete socket type.

pub mod buffer;
pub mod channel;
pub mod duplex;
mod stream;
pub mod tcp;

pub use buffer::{Buffer, SharedBuffer};
pub use channel::{Channel, Connection, Identifier, Reader, Writer};

use std::fmt;

/// crate-wide error type for connection/read/write failures. `beam-http`'s parser
/// errors and `beam-rpc`'s protocol errors are distinct types layered on top of this
/// one (via `From` conversions) rather than a single shared catch-all.
#[derive(Debug)]
pub enum Error {
    /// the transport reached end-of-file, or the local/peer side closed the
    /// connection.
    EndOfFile,
    /// failed to establish the transport in the first place.
    Connect(std::io::Error),
    /// an I/O failure on an already-established transport.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndOfFile => write!(f, "end of file"),
            Error::Connect(cause) => write!(f, "connect failed: {cause}"),
            Error::Io(cause) => write!(f, "io error: {cause}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::EndOfFile => None,
            Error::Connect(cause) | Error::Io(cause) => Some(cause),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(cause: std::io::Error) -> Self {
        if cause.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::EndOfFile
        } else {
            Error::Io(cause)
        }
    }
}

//! client-facing error type, unifying transport failures and malformed
//! responses behind one enum callers can match on.

use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    /// the injected channel builder failed to establish a connection.
    Connect(beam_io::Error),
    /// the connection failed mid-request/response, after a retry (if one was
    /// attempted) also failed.
    Io(beam_io::Error),
    /// the peer sent a response this crate's parser could not make sense of.
    Protocol(beam_http::HttpError),
    /// the request's `Uri` was not a valid absolute URI (missing host, unsupported
    /// scheme, ...).
    InvalidUri(beam_http::HttpError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connect(cause) => write!(f, "failed to connect: {cause}"),
            ClientError::Io(cause) => write!(f, "connection failed: {cause}"),
            ClientError::Protocol(cause) => write!(f, "protocol error: {cause}"),
            ClientError::InvalidUri(cause) => write!(f, "invalid URI: {cause}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Connect(cause) | ClientError::Io(cause) => Some(cause),
            ClientError::Protocol(cause) | ClientError::InvalidUri(cause) => Some(cause),
        }
    }
}

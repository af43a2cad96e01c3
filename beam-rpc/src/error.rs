//! error kinds raised by the service protocol and service client: transport
//! failures surface uniformly as [`RpcError::PipeBroken`]; a remote handler's
//! logical failure comes back as [`RpcError::Remote`].

use std::fmt;

#[derive(Debug, Clone)]
pub enum RpcError {
    /// the channel closed (or a read/write on it failed) while a request was
    /// pending, or while the dispatcher's reader loop was draining it.
    PipeBroken,
    /// a [`ResponseMessage`](crate::message::ResponseMessage) carried an exception
    /// rather than a result. carries the remote handler's message, not the original
    /// exception value -- the wire format only promises a human-readable string.
    Remote(String),
    /// the codec failed to encode or decode a frame.
    Codec(String),
    /// a bounded wait (e.g. login during reconnect) expired.
    Timeout,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::PipeBroken => write!(f, "channel closed"),
            RpcError::Remote(message) => write!(f, "remote error: {message}"),
            RpcError::Codec(message) => write!(f, "codec error: {message}"),
            RpcError::Timeout => write!(f, "timed out"),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<beam_io::Error> for RpcError {
    fn from(_: beam_io::Error) -> Self {
        RpcError::PipeBroken
    }
}

//! `Header`: a plain name/value pair, plus `SpecialHeaders`, the structured
//! side-record for the three headers whose value affects message framing (`Host`,
//! `Content-Length`, `Connection`) -- kept out of the generic header
//! list so framing stays consistent after the request/response is mutated.

use std::fmt;

/// a single generic header line, order-preserving within `HttpRequest`/
/// `HttpResponse`'s header list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name_eq_ignore_ascii_case(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// how the `Connection` header should be framed/emitted, across its three
/// wire-level values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Close,
    KeepAlive,
    Upgrade,
}

impl Connection {
    pub fn as_str(self) -> &'static str {
        match self {
            Connection::Close => "close",
            Connection::KeepAlive => "keep-alive",
            Connection::Upgrade => "Upgrade",
        }
    }

    /// framing interpretation of an incoming `Connection:` value: `"Upgrade"` ->
    /// `Upgrade`, `"keep-alive"` -> `KeepAlive`, anything else -> `Close`.
    pub fn parse(value: &str) -> Connection {
        if value.eq_ignore_ascii_case("upgrade") {
            Connection::Upgrade
        } else if value.eq_ignore_ascii_case("keep-alive") {
            Connection::KeepAlive
        } else {
            Connection::Close
        }
    }
}

/// the structured side-record for framing headers. `host`/`content_length`/
/// `connection` are modeled as fields here rather than generic `Header` entries so
/// they stay internally consistent after `HttpRequest`/`HttpResponse` mutation
/// (e.g. `set_body` keeping `content_length` in sync).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialHeaders {
    pub host: String,
    pub content_length: usize,
    pub connection: Connection,
}

impl SpecialHeaders {
    pub fn new(host: impl Into<String>, content_length: usize, connection: Connection) -> Self {
        Self { host: host.into(), content_length, connection }
    }

    /// default framing: HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close,
    /// unless a `Connection:` header overrides it.
    pub fn default_connection_for(version: crate::version::Version) -> Connection {
        if version == crate::version::Version::HTTP_10 {
            Connection::Close
        } else {
            Connection::KeepAlive
        }
    }
}

//! HTTP version and method value types. both are thin newtypes over the `http`
//! crate's own `Version`/`Method` -- these two are pure value types with no
//! framing-dependent behavior, so reusing well-trodden ground avoids reinventing it --
//! restricted to a small enumerated set.

use std::fmt;

use crate::error::HttpError;

/// `HTTP/1.0` or `HTTP/1.1` -- the only two supported versions; anything else
/// fails to parse into a `Version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(http::Version);

impl Version {
    pub const HTTP_10: Version = Version(http::Version::HTTP_10);
    pub const HTTP_11: Version = Version(http::Version::HTTP_11);

    pub fn major(self) -> u8 {
        if self.0 == http::Version::HTTP_10 {
            1
        } else {
            1
        }
    }

    pub fn minor(self) -> u8 {
        if self.0 == http::Version::HTTP_10 {
            0
        } else {
            1
        }
    }

    pub fn as_http(self) -> http::Version {
        self.0
    }

    pub fn parse(text: &str) -> Result<Self, HttpError> {
        match text {
            "HTTP/1.0" => Ok(Version::HTTP_10),
            "HTTP/1.1" => Ok(Version::HTTP_11),
            other => Err(HttpError::invalid_request(format!("unsupported HTTP version {other:?}"))),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Version::HTTP_10 {
            write!(f, "HTTP/1.0")
        } else {
            write!(f, "HTTP/1.1")
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::HTTP_11
    }
}

/// the supported subset of HTTP methods: `HEAD, GET, POST, PUT, DELETE, TRACE,
/// OPTIONS, CONNECT, PATCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method(MethodInner);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MethodInner {
    Head,
    Get,
    Post,
    Put,
    Delete,
    Trace,
    Options,
    Connect,
    Patch,
}

impl Method {
    pub const HEAD: Method = Method(MethodInner::Head);
    pub const GET: Method = Method(MethodInner::Get);
    pub const POST: Method = Method(MethodInner::Post);
    pub const PUT: Method = Method(MethodInner::Put);
    pub const DELETE: Method = Method(MethodInner::Delete);
    pub const TRACE: Method = Method(MethodInner::Trace);
    pub const OPTIONS: Method = Method(MethodInner::Options);
    pub const CONNECT: Method = Method(MethodInner::Connect);
    pub const PATCH: Method = Method(MethodInner::Patch);

    pub fn as_str(self) -> &'static str {
        match self.0 {
            MethodInner::Head => "HEAD",
            MethodInner::Get => "GET",
            MethodInner::Post => "POST",
            MethodInner::Put => "PUT",
            MethodInner::Delete => "DELETE",
            MethodInner::Trace => "TRACE",
            MethodInner::Options => "OPTIONS",
            MethodInner::Connect => "CONNECT",
            MethodInner::Patch => "PATCH",
        }
    }

    pub fn as_http(self) -> http::Method {
        match self.0 {
            MethodInner::Head => http::Method::HEAD,
            MethodInner::Get => http::Method::GET,
            MethodInner::Post => http::Method::POST,
            MethodInner::Put => http::Method::PUT,
            MethodInner::Delete => http::Method::DELETE,
            MethodInner::Trace => http::Method::TRACE,
            MethodInner::Options => http::Method::OPTIONS,
            MethodInner::Connect => http::Method::CONNECT,
            MethodInner::Patch => http::Method::PATCH,
        }
    }

    pub fn parse(text: &str) -> Result<Self, HttpError> {
        Ok(Method(match text {
            "HEAD" => MethodInner::Head,
            "GET" => MethodInner::Get,
            "POST" => MethodInner::Post,
            "PUT" => MethodInner::Put,
            "DELETE" => MethodInner::Delete,
            "TRACE" => MethodInner::Trace,
            "OPTIONS" => MethodInner::Options,
            "CONNECT" => MethodInner::Connect,
            "PATCH" => MethodInner::Patch,
            other => return Err(HttpError::invalid_request(format!("unknown method {other:?}"))),
        }))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_parses_known_values() {
        assert_eq!(Version::parse("HTTP/1.0").unwrap(), Version::HTTP_10);
        assert_eq!(Version::parse("HTTP/1.1").unwrap(), Version::HTTP_11);
        assert!(Version::parse("HTTP/2.0").is_err());
    }

    #[test]
    fn method_round_trips_through_str() {
        for m in [Method::GET, Method::POST, Method::PATCH, Method::CONNECT] {
            assert_eq!(Method::parse(m.as_str()).unwrap(), m);
        }
        assert!(Method::parse("BOGUS").is_err());
    }
}

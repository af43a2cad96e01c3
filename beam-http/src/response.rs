//! `HttpResponse`: `{version, status, headers, special_headers, cookies, body}`,
//! defaulting to `200 OK` / `Content-Length: 0` / keep-alive, with `set_body` keeping
//! `content_length` synchronized and `set_header`/`set_cookie` upserting by name.

use crate::{
    cookie::Cookie,
    header::{Connection, Header, SpecialHeaders},
    status::StatusCode,
    version::Version,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: Version,
    pub status: StatusCode,
    pub headers: Vec<Header>,
    pub special_headers: SpecialHeaders,
    pub cookies: Vec<Cookie>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// `200 OK`, empty body, keep-alive appropriate to `version`.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            status: StatusCode::OK,
            headers: Vec::new(),
            special_headers: SpecialHeaders::new("", 0, SpecialHeaders::default_connection_for(version)),
            cookies: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// builds a response straight from what was already on the wire; framing
    /// headers reflect exactly what was received rather than being re-derived, and
    /// `Set-Cookie` lines are parsed into structured `Cookie`s rather than kept as
    /// generic headers.
    pub(crate) fn from_wire(version: Version, status: StatusCode, headers: Vec<Header>, body: Vec<u8>) -> Self {
        let connection = headers
            .iter()
            .find(|h| h.name_eq_ignore_ascii_case("connection"))
            .map(|h| Connection::parse(&h.value))
            .unwrap_or(SpecialHeaders::default_connection_for(version));
        let content_length = body.len();

        let mut cookies = Vec::new();
        let mut generic = Vec::with_capacity(headers.len());
        for header in headers {
            if header.name_eq_ignore_ascii_case("set-cookie") {
                if let Some(cookie) = Cookie::parse_set_cookie_header(&header.value) {
                    cookies.push(cookie);
                }
            } else {
                generic.push(header);
            }
        }

        Self {
            version,
            status,
            special_headers: SpecialHeaders::new("", content_length, connection),
            headers: generic,
            cookies,
            body,
        }
    }

    pub fn get_header(&self, name: &str) -> Option<String> {
        if name.eq_ignore_ascii_case("content-length") {
            return Some(self.special_headers.content_length.to_string());
        }
        if name.eq_ignore_ascii_case("connection") {
            return Some(self.special_headers.connection.as_str().to_string());
        }
        self.headers.iter().find(|h| h.name_eq_ignore_ascii_case(name)).map(|h| h.value.clone())
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|h| h.name_eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.value = value,
            None => self.headers.push(Header::new(name, value)),
        }
    }

    pub fn set_connection(&mut self, connection: Connection) {
        self.special_headers.connection = connection;
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.special_headers.content_length = body.len();
        self.body = body;
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_to_ok_with_zero_length_keepalive() {
        let resp = HttpResponse::new(Version::HTTP_11);
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.get_header("Content-Length").as_deref(), Some("0"));
        assert_eq!(resp.special_headers.connection, Connection::KeepAlive);
    }

    #[test]
    fn http_10_defaults_to_close() {
        let resp = HttpResponse::new(Version::HTTP_10);
        assert_eq!(resp.special_headers.connection, Connection::Close);
    }

    #[test]
    fn set_body_updates_content_length() {
        let mut resp = HttpResponse::new(Version::HTTP_11);
        resp.set_body(b"hi".to_vec());
        assert_eq!(resp.get_header("Content-Length").as_deref(), Some("2"));
    }

    #[test]
    fn set_cookie_upserts_by_name() {
        let mut resp = HttpResponse::new(Version::HTTP_11);
        resp.set_cookie(Cookie::new("a", "1"));
        resp.set_cookie(Cookie::new("a", "2"));
        assert_eq!(resp.cookies.len(), 1);
        assert_eq!(resp.cookies[0].value, "2");
    }
}

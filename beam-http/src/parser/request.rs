//! Incremental request-line / headers / body state machine feeding `HttpRequest`s
//! out of a byte stream, one complete message at a time (pipelined requests leave
//! the next request-line buffered for the following `get_next` call).

use beam_io::Buffer;

use crate::{
    error::HttpError,
    header::Header,
    request::HttpRequest,
    uri::Uri,
    version::{Method, Version},
};

use super::{body_mode, drive_chunked, find_line, try_parse_headers, BodyMode, BodyState};

fn drive_fixed(buffer: &Buffer, consumed: &mut usize, remaining: &mut usize, body: &mut Vec<u8>) -> bool {
    let data = &buffer.get_data()[*consumed..];
    let take = data.len().min(*remaining);
    body.extend_from_slice(&data[..take]);
    *consumed += take;
    *remaining -= take;
    *remaining == 0
}

enum State {
    StartLine,
    Headers { method: Method, uri: Uri, version: Version, headers: Vec<Header> },
    Body { method: Method, uri: Uri, version: Version, headers: Vec<Header>, body_state: BodyState, body: Vec<u8> },
    Errored(String),
}

pub struct HttpRequestParser {
    buffer: Buffer,
    consumed: usize,
    state: State,
}

impl Default for HttpRequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// result of a single state-transition step: either the state machine needs more
/// bytes, a message completed, an error occurred, or it should loop again
/// immediately (state advanced but nothing to report yet).
enum Step {
    NeedMore(State),
    Done(HttpRequest),
    Error(String),
    Continue(State),
}

impl HttpRequestParser {
    pub fn new() -> Self {
        Self { buffer: Buffer::new(), consumed: 0, state: State::StartLine }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    /// attempts to produce the next complete request; `Ok(None)` means more bytes
    /// are needed. once a malformed message is detected, every subsequent call
    /// returns the same error -- a parser never resynchronizes mid-stream.
    pub fn get_next(&mut self) -> Result<Option<HttpRequest>, HttpError> {
        loop {
            let taken = std::mem::replace(&mut self.state, State::StartLine);
            let state = match taken {
                State::Errored(message) => {
                    self.state = State::Errored(message.clone());
                    return Err(HttpError::invalid_request(message));
                }
                other => other,
            };

            match step(&self.buffer, &mut self.consumed, state) {
                Step::NeedMore(state) => {
                    self.state = state;
                    return Ok(None);
                }
                Step::Continue(state) => {
                    self.state = state;
                }
                Step::Done(request) => {
                    self.buffer.consume_front(self.consumed);
                    self.consumed = 0;
                    self.state = State::StartLine;
                    return Ok(Some(request));
                }
                Step::Error(message) => {
                    tracing::debug!(error = %message, "rejecting malformed HTTP request");
                    self.state = State::Errored(message.clone());
                    return Err(HttpError::invalid_request(message));
                }
            }
        }
    }
}

fn step(buffer: &Buffer, consumed: &mut usize, state: State) -> Step {
    match state {
        State::Errored(message) => Step::Error(message),
        State::StartLine => {
            let data = &buffer.get_data()[*consumed..];
            let (line_end, line_total) = match find_line(data) {
                Ok(Some(pos)) => pos,
                Ok(None) => return Step::NeedMore(State::StartLine),
                Err(e) => return Step::Error(e.to_string()),
            };
            let line = match std::str::from_utf8(&data[..line_end]) {
                Ok(line) => line,
                Err(_) => return Step::Error("request line is not valid UTF-8".to_string()),
            };
            let mut parts = line.splitn(3, ' ');
            let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next()) else {
                return Step::Error(format!("malformed request line {line:?}"));
            };
            let method = match Method::parse(method) {
                Ok(method) => method,
                Err(e) => return Step::Error(e.to_string()),
            };
            let uri = match Uri::parse(target) {
                Ok(uri) => uri,
                Err(e) => return Step::Error(e.to_string()),
            };
            let version = match Version::parse(version) {
                Ok(version) => version,
                Err(e) => return Step::Error(e.to_string()),
            };
            *consumed += line_total;
            Step::Continue(State::Headers { method, uri, version, headers: Vec::new() })
        }
        State::Headers { method, uri, version, mut headers } => {
            match try_parse_headers(buffer, consumed, &mut headers) {
                Ok(None) => Step::NeedMore(State::Headers { method, uri, version, headers }),
                Err(e) => Step::Error(e.to_string()),
                Ok(Some(())) => {
                    let mode = match body_mode(&headers) {
                        Ok(mode) => mode,
                        Err(e) => return Step::Error(e.to_string()),
                    };
                    match mode {
                        BodyMode::None | BodyMode::ContentLength(0) => {
                            Step::Done(HttpRequest::from_wire(method, uri, version, headers, Vec::new()))
                        }
                        BodyMode::ContentLength(remaining) => Step::Continue(State::Body {
                            method,
                            uri,
                            version,
                            headers,
                            body_state: BodyState::Fixed { remaining },
                            body: Vec::with_capacity(remaining),
                        }),
                        BodyMode::Chunked => {
                            Step::Continue(State::Body { method, uri, version, headers, body_state: BodyState::ChunkSize, body: Vec::new() })
                        }
                    }
                }
            }
        }
        State::Body { method, uri, version, headers, mut body_state, mut body } => {
            let done = match &mut body_state {
                BodyState::Fixed { remaining } => Ok(drive_fixed(buffer, consumed, remaining, &mut body)),
                _ => drive_chunked(buffer, consumed, &mut body_state, &mut body).map(|r| r.is_some()),
            };
            match done {
                Err(e) => Step::Error(e.to_string()),
                Ok(false) => Step::NeedMore(State::Body { method, uri, version, headers, body_state, body }),
                Ok(true) => Step::Done(HttpRequest::from_wire(method, uri, version, headers, body)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_simple_get_request() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"GET /path HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let request = parser.get_next().unwrap().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.uri.path, "/path");
        assert_eq!(request.special_headers.host, "example.com");
        assert!(request.body.is_empty());
    }

    #[test]
    fn incomplete_request_returns_none_until_fed_more() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"GET /path HTTP/1.1\r\n");
        assert!(parser.get_next().unwrap().is_none());
        parser.feed(b"Host: h\r\n\r\n");
        assert!(parser.get_next().unwrap().is_some());
    }

    #[test]
    fn parses_fixed_length_body_across_feeds() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"POST /x HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhel");
        assert!(parser.get_next().unwrap().is_none());
        parser.feed(b"lo");
        let request = parser.get_next().unwrap().unwrap();
        assert_eq!(request.body, b"hello");
    }

    #[test]
    fn parses_chunked_body() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"POST /x HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        let request = parser.get_next().unwrap().unwrap();
        assert_eq!(request.body, b"Wikipedia");
    }

    #[test]
    fn pipelined_requests_parse_one_at_a_time() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"GET /a HTTP/1.1\r\nHost: h\r\n\r\nGET /b HTTP/1.1\r\nHost: h\r\n\r\n");
        let first = parser.get_next().unwrap().unwrap();
        let second = parser.get_next().unwrap().unwrap();
        assert_eq!(first.uri.path, "/a");
        assert_eq!(second.uri.path, "/b");
    }

    #[test]
    fn malformed_request_line_is_rejected_and_sticky() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"NOTAMETHOD /x HTTP/1.1\r\n\r\n");
        assert!(parser.get_next().is_err());
        assert!(parser.get_next().is_err());
    }

    #[test]
    fn chunk_extension_is_ignored() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"POST /x HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n4;ext=1\r\nWiki\r\n0\r\n\r\n");
        let request = parser.get_next().unwrap().unwrap();
        assert_eq!(request.body, b"Wiki");
    }

    #[test]
    fn chunk_data_without_trailing_crlf_is_rejected() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"POST /x HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWikiXX0\r\n\r\n");
        assert!(parser.get_next().is_err());
    }

    #[test]
    fn header_with_no_space_after_colon_is_rejected() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"GET /x HTTP/1.1\r\nHost:h\r\n\r\n");
        assert!(parser.get_next().is_err());
    }

    #[test]
    fn cookie_header_is_parsed_into_structured_cookies_not_generic_headers() {
        let mut parser = HttpRequestParser::new();
        parser.feed(b"GET /x HTTP/1.1\r\nHost: h\r\nCookie: session=abc123\r\n\r\n");
        let request = parser.get_next().unwrap().unwrap();
        assert_eq!(request.cookies, vec![crate::cookie::Cookie::new("session", "abc123")]);
        assert!(!request.headers.iter().any(|h| h.name_eq_ignore_ascii_case("cookie")));
        assert!(!request.headers.iter().any(|h| h.name_eq_ignore_ascii_case("host")));
    }
}

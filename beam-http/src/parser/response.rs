//! Incremental status-line / headers / body state machine feeding `HttpResponse`s
//! out of a byte stream. Mirrors `request`'s state machine; a response parser must
//! additionally be told (via `expect_no_body`) when the corresponding request used
//! `HEAD`, since such responses carry framing headers for a body that was never
//! actually sent.

use beam_io::Buffer;

use crate::{error::HttpError, header::Header, response::HttpResponse, status::StatusCode, version::Version};

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
    StatusLine,
    Headers { version: Version, status: StatusCode, headers: Vec<Header> },
    Body { version: Version, status: StatusCode, headers: Vec<Header>, body_state: BodyState, body: Vec<u8> },
    Errored(String),
}

enum Step {
    NeedMore(State),
    Done(HttpResponse),
    Error(String),
    Continue(State),
}

pub struct HttpResponseParser {
    buffer: Buffer,
    consumed: usize,
    state: State,
    expect_no_body: bool,
}

impl Default for HttpResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpResponseParser {
    pub fn new() -> Self {
        Self { buffer: Buffer::new(), consumed: 0, state: State::StatusLine, expect_no_body: false }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.append(data);
    }

    /// the next response parsed off this stream corresponds to a `HEAD` request,
    /// so its body is empty regardless of what `Content-Length`/`Transfer-Encoding`
    /// claim.
    pub fn expect_no_body(&mut self) {
        self.expect_no_body = true;
    }

    pub fn get_next(&mut self) -> Result<Option<HttpResponse>, HttpError> {
        loop {
            let taken = std::mem::replace(&mut self.state, State::StatusLine);
            let state = match taken {
                State::Errored(message) => {
                    self.state = State::Errored(message.clone());
                    return Err(HttpError::invalid_response(message));
                }
                other => other,
            };

            match step(&self.buffer, &mut self.consumed, state, self.expect_no_body) {
                Step::NeedMore(state) => {
                    self.state = state;
                    return Ok(None);
                }
                Step::Continue(state) => {
                    self.state = state;
                }
                Step::Done(response) => {
                    self.buffer.consume_front(self.consumed);
                    self.consumed = 0;
                    self.state = State::StatusLine;
                    self.expect_no_body = false;
                    return Ok(Some(response));
                }
                Step::Error(message) => {
                    tracing::debug!(error = %message, "rejecting malformed HTTP response");
                    self.state = State::Errored(message.clone());
                    return Err(HttpError::invalid_response(message));
                }
            }
        }
    }
}

fn step(buffer: &Buffer, consumed: &mut usize, state: State, expect_no_body: bool) -> Step {
    match state {
        State::Errored(message) => Step::Error(message),
        State::StatusLine => {
            let data = &buffer.get_data()[*consumed..];
            let (line_end, line_total) = match find_line(data) {
                Ok(Some(pos)) => pos,
                Ok(None) => return Step::NeedMore(State::StatusLine),
                Err(e) => return Step::Error(e.to_string()),
            };
            let line = match std::str::from_utf8(&data[..line_end]) {
                Ok(line) => line,
                Err(_) => return Step::Error("status line is not valid UTF-8".to_string()),
            };
            let mut parts = line.splitn(3, ' ');
            // the reason phrase is optional per the grammar (`VERSION SP CODE [SP REASON]`);
            // only the version and the numeric code are required.
            let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
                return Step::Error(format!("malformed status line {line:?}"));
            };
            let version = match Version::parse(version) {
                Ok(version) => version,
                Err(e) => return Step::Error(e.to_string()),
            };
            let code = match code.trim().parse::<u16>() {
                Ok(code) => code,
                Err(_) => return Step::Error(format!("bad status code {code:?}")),
            };
            let status = match StatusCode::from_u16(code) {
                Ok(status) => status,
                Err(e) => return Step::Error(e.to_string()),
            };
            *consumed += line_total;
            Step::Continue(State::Headers { version, status, headers: Vec::new() })
        }
        State::Headers { version, status, mut headers } => {
            match try_parse_headers(buffer, consumed, &mut headers) {
                Ok(None) => Step::NeedMore(State::Headers { version, status, headers }),
                Err(e) => Step::Error(e.to_string()),
                Ok(Some(())) => {
                    if expect_no_body {
                        return Step::Done(HttpResponse::from_wire(version, status, headers, Vec::new()));
                    }
                    let mode = match body_mode(&headers) {
                        Ok(mode) => mode,
                        Err(e) => return Step::Error(e.to_string()),
                    };
                    match mode {
                        BodyMode::None | BodyMode::ContentLength(0) => {
                            Step::Done(HttpResponse::from_wire(version, status, headers, Vec::new()))
                        }
                        BodyMode::ContentLength(remaining) => Step::Continue(State::Body {
                            version,
                            status,
                            headers,
                            body_state: BodyState::Fixed { remaining },
                            body: Vec::with_capacity(remaining),
                        }),
                        BodyMode::Chunked => {
                            Step::Continue(State::Body { version, status, headers, body_state: BodyState::ChunkSize, body: Vec::new() })
                        }
                    }
                }
            }
        }
        State::Body { version, status, headers, mut body_state, mut body } => {
            let done = match &mut body_state {
                BodyState::Fixed { remaining } => Ok(drive_fixed(buffer, consumed, remaining, &mut body)),
                _ => drive_chunked(buffer, consumed, &mut body_state, &mut body).map(|r| r.is_some()),
            };
            match done {
                Err(e) => Step::Error(e.to_string()),
                Ok(false) => Step::NeedMore(State::Body { version, status, headers, body_state, body }),
                Ok(true) => Step::Done(HttpResponse::from_wire(version, status, headers, body)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_simple_response() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        let response = parser.get_next().unwrap().unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"hi");
    }

    #[test]
    fn head_response_has_no_body_despite_content_length() {
        let mut parser = HttpResponseParser::new();
        parser.expect_no_body();
        parser.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n");
        let response = parser.get_next().unwrap().unwrap();
        assert!(response.body.is_empty());
    }

    #[test]
    fn parses_chunked_response_body() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nfoo\r\n0\r\n\r\n");
        let response = parser.get_next().unwrap().unwrap();
        assert_eq!(response.body, b"foo");
    }

    #[test]
    fn rejects_invalid_status_code() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 999 Bogus\r\n\r\n");
        assert!(parser.get_next().is_err());
    }

    #[test]
    fn status_line_without_reason_phrase_is_accepted() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 200\r\n\r\n");
        let response = parser.get_next().unwrap().unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn chunk_data_without_trailing_crlf_is_rejected() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nfooXX0\r\n\r\n");
        assert!(parser.get_next().is_err());
    }

    #[test]
    fn set_cookie_header_is_parsed_into_structured_cookies_not_generic_headers() {
        let mut parser = HttpResponseParser::new();
        parser.feed(b"HTTP/1.1 200 OK\r\nSet-Cookie: session=abc123; Path=/app\r\n\r\n");
        let response = parser.get_next().unwrap().unwrap();
        assert_eq!(response.cookies.len(), 1);
        assert_eq!(response.cookies[0].name, "session");
        assert_eq!(response.cookies[0].path, "/app");
        assert!(!response.headers.iter().any(|h| h.name_eq_ignore_ascii_case("set-cookie")));
    }
}

//! error kinds this crate raises: malformed URIs, and parser rejections surfaced
//! from `get_next_request`/`get_next_response`.

use std::fmt;

#[derive(Debug)]
pub enum HttpError {
    /// the request parser detected malformation.
    InvalidRequest(String),
    /// the response parser detected malformation (`InvalidHttpResponse`).
    InvalidResponse(String),
    /// the URI parser rejected input (`MalformedUri`).
    MalformedUri(String),
}

impl HttpError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        HttpError::InvalidRequest(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        HttpError::InvalidResponse(message.into())
    }

    pub fn malformed_uri(message: impl Into<String>) -> Self {
        HttpError::MalformedUri(message.into())
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::InvalidRequest(msg) => write!(f, "invalid HTTP request: {msg}"),
            HttpError::InvalidResponse(msg) => write!(f, "invalid HTTP response: {msg}"),
            HttpError::MalformedUri(msg) => write!(f, "malformed URI: {msg}"),
        }
    }
}

impl std::error::Error for HttpError {}

//! IANA status codes, mapped to their reason phrases. thin wrapper over
//! `http::StatusCode`, whose `canonical_reason()` already carries the IANA registry
//! reason-phrase text.

use std::fmt;

use crate::error::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(http::StatusCode);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(http::StatusCode::OK);
    pub const NOT_FOUND: StatusCode = StatusCode(http::StatusCode::NOT_FOUND);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(http::StatusCode::INTERNAL_SERVER_ERROR);

    pub fn from_u16(code: u16) -> Result<Self, HttpError> {
        http::StatusCode::from_u16(code)
            .map(StatusCode)
            .map_err(|_| HttpError::invalid_response(format!("invalid status code {code}")))
    }

    pub fn as_u16(self) -> u16 {
        self.0.as_u16()
    }

    pub fn reason_phrase(self) -> &'static str {
        self.0.canonical_reason().unwrap_or("")
    }

    pub fn is_success(self) -> bool {
        self.0.is_success()
    }

    pub fn is_redirection(self) -> bool {
        self.0.is_redirection()
    }

    pub fn is_server_error(self) -> bool {
        self.0.is_server_error()
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_code_has_reason_phrase() {
        let code = StatusCode::from_u16(404).unwrap();
        assert_eq!(code.reason_phrase(), "Not Found");
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        assert!(StatusCode::from_u16(42).is_err());
    }
}

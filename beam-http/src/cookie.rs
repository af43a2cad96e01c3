//! `Cookie`: `{name, value, domain, path, expiration, secure, http_only}`, with wire
//! parsing/encoding for both the request-side `Cookie:` header and the response-side
//! `Set-Cookie:` header (RFC 6265).

use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    pub expiration: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: "/".to_string(),
            expiration: None,
            secure: false,
            http_only: false,
        }
    }

    /// parses the value of a request-side `Cookie:` header: `"k=v; k=v; ..."`. a
    /// token with no `=` becomes `Cookie("", token)`.
    pub fn parse_request_header(value: &str) -> Vec<Cookie> {
        value
            .split("; ")
            .filter(|tok| !tok.is_empty())
            .map(|tok| match tok.split_once('=') {
                Some((k, v)) => Cookie::new(k, v),
                None => Cookie::new("", tok),
            })
            .collect()
    }

    /// encodes a set of request cookies into the single `"k=v; k=v"` form that goes
    /// on the wire as one `Cookie:` header line.
    pub fn encode_request_header(cookies: &[Cookie]) -> String {
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// parses one response-side `Set-Cookie:` header value. the first `name=value`
    /// token sets identity; subsequent `; `-separated tokens are attributes
    /// (`Path`, `Domain`, `Expires`, `Secure`, `HttpOnly`), matched
    /// case-insensitively.
    pub fn parse_set_cookie_header(value: &str) -> Option<Cookie> {
        let mut parts = value.split("; ");
        let (name, val) = parts.next()?.split_once('=')?;
        let mut cookie = Cookie::new(name, val);

        for attr in parts {
            let (attr_name, attr_value) = match attr.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (attr, None),
            };
            match attr_name.to_ascii_lowercase().as_str() {
                "path" => {
                    if let Some(v) = attr_value {
                        cookie.path = v.to_string();
                    }
                }
                "domain" => cookie.domain = attr_value.map(str::to_string),
                "expires" => {
                    if let Some(v) = attr_value {
                        cookie.expiration = httpdate::parse_http_date(v).ok();
                    }
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }
        Some(cookie)
    }

    /// encodes this cookie as a `Set-Cookie:` header value, including its
    /// attributes.
    pub fn encode_set_cookie_header(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if !self.path.is_empty() {
            out.push_str(&format!("; Path={}", self.path));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if let Some(expiration) = self.expiration {
            out.push_str(&format!("; Expires={}", httpdate::fmt_http_date(expiration)));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_request_cookie_header() {
        let cookies = Cookie::parse_request_header("session=abc123; theme=dark");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "session");
        assert_eq!(cookies[0].value, "abc123");
        assert_eq!(cookies[1].name, "theme");
    }

    #[test]
    fn token_without_equals_becomes_empty_name() {
        let cookies = Cookie::parse_request_header("justavalue");
        assert_eq!(cookies[0].name, "");
        assert_eq!(cookies[0].value, "justavalue");
    }

    #[test]
    fn encodes_request_header_as_single_line() {
        let cookies = vec![Cookie::new("a", "1"), Cookie::new("b", "2")];
        assert_eq!(Cookie::encode_request_header(&cookies), "a=1; b=2");
    }

    #[test]
    fn parses_set_cookie_with_attributes() {
        let cookie = Cookie::parse_set_cookie_header("session=abc123; Path=/app; Secure; HttpOnly").unwrap();
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path, "/app");
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn default_path_is_root() {
        let cookie = Cookie::new("a", "b");
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn encode_set_cookie_round_trips_attributes() {
        let mut cookie = Cookie::new("a", "1");
        cookie.secure = true;
        cookie.http_only = true;
        cookie.domain = Some("example.com".to_string());
        let encoded = cookie.encode_set_cookie_header();
        let parsed = Cookie::parse_set_cookie_header(&encoded).unwrap();
        assert_eq!(parsed, cookie);
    }
}

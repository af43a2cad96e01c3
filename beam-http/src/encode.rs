//! Wire encoding for `HttpRequest`/`HttpResponse`: request-line/status-line, header
//! block (generic headers, then the three framing headers, then one `Cookie:`/
//! `Set-Cookie:` line per cookie), a blank line, and the body.

use crate::{request::HttpRequest, response::HttpResponse};

pub fn encode_request(request: &HttpRequest) -> Vec<u8> {
    let mut out = Vec::with_capacity(request.body.len() + 256);

    out.extend_from_slice(request.method.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(request.uri.path_and_query().as_bytes());
    out.push(b' ');
    out.extend_from_slice(request.version.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");

    for header in &request.headers {
        write_header_line(&mut out, &header.name, &header.value);
    }

    if !request.special_headers.host.is_empty() {
        write_header_line(&mut out, "Host", &request.special_headers.host);
    }
    write_header_line(&mut out, "Content-Length", &request.special_headers.content_length.to_string());
    write_header_line(&mut out, "Connection", request.special_headers.connection.as_str());

    if !request.cookies.is_empty() {
        write_header_line(&mut out, "Cookie", &crate::cookie::Cookie::encode_request_header(&request.cookies));
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&request.body);
    out
}

pub fn encode_response(response: &HttpResponse) -> Vec<u8> {
    let mut out = Vec::with_capacity(response.body.len() + 256);

    out.extend_from_slice(response.version.to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(response.status.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");

    for header in &response.headers {
        write_header_line(&mut out, &header.name, &header.value);
    }

    write_header_line(&mut out, "Content-Length", &response.special_headers.content_length.to_string());
    write_header_line(&mut out, "Connection", response.special_headers.connection.as_str());

    for cookie in &response.cookies {
        write_header_line(&mut out, "Set-Cookie", &cookie.encode_set_cookie_header());
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.body);
    out
}

fn write_header_line(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{uri::Uri, version::{Method, Version}};

    #[test]
    fn encodes_get_request_line_and_framing_headers() {
        let request = HttpRequest::new(Method::GET, Uri::parse("http://example.com/path").unwrap(), Version::HTTP_11, vec![], vec![]);
        let encoded = String::from_utf8(encode_request(&request)).unwrap();
        assert!(encoded.starts_with("GET /path HTTP/1.1\r\n"));
        assert!(encoded.contains("Host: example.com\r\n"));
        assert!(encoded.contains("Content-Length: 0\r\n"));
        assert!(encoded.contains("Connection: keep-alive\r\n"));
        assert!(encoded.ends_with("\r\n\r\n"));
    }

    #[test]
    fn encodes_cookies_as_single_line() {
        let mut request = HttpRequest::new(Method::GET, Uri::parse("http://example.com/").unwrap(), Version::HTTP_11, vec![], vec![]);
        request.set_cookie(crate::cookie::Cookie::new("a", "1"));
        request.set_cookie(crate::cookie::Cookie::new("b", "2"));
        let encoded = String::from_utf8(encode_request(&request)).unwrap();
        assert!(encoded.contains("Cookie: a=1; b=2\r\n"));
    }

    #[test]
    fn encodes_response_status_line_and_set_cookie() {
        let mut response = HttpResponse::new(Version::HTTP_11);
        response.set_body(b"ok".to_vec());
        response.set_cookie(crate::cookie::Cookie::new("session", "xyz"));
        let encoded = String::from_utf8(encode_response(&response)).unwrap();
        assert!(encoded.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(encoded.contains("Content-Length: 2\r\n"));
        assert!(encoded.contains("Set-Cookie: session=xyz; Path=/\r\n"));
        assert!(encoded.ends_with("ok"));
    }
}

//! Incremental HTTP/1.x parsing: bytes arrive in arbitrary chunks via `feed`, and
//! `get_next` pulls out as many complete messages as the buffered bytes allow,
//! leaving a partial message buffered for the next `feed`. Both the request and
//! response parser share the header/chunked-body state machine below; only the
//! start line differs.

pub mod request;
pub mod response;

use beam_io::Buffer;

use crate::{error::HttpError, header::Header};

pub(crate) const MAX_LINE: usize = 8 * 1024;
pub(crate) const MAX_HEADERS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyMode {
    /// no body at all (e.g. responses to `HEAD`, or absent `Content-Length`).
    None,
    ContentLength(usize),
    Chunked,
}

#[derive(Debug)]
pub(crate) enum BodyState {
    Fixed { remaining: usize },
    ChunkSize,
    ChunkData { remaining: usize },
    ChunkTrailer { headers: Vec<Header> },
}

/// scans already-buffered bytes for a CRLF-terminated line and returns the line
/// (without the terminator) plus its total length *including* the CRLF; `None`
/// means no complete line is buffered yet.
pub(crate) fn find_line(data: &[u8]) -> Result<Option<(usize, usize)>, HttpError> {
    if data.len() > MAX_LINE && !data.iter().take(MAX_LINE).any(|&b| b == b'\n') {
        return Err(HttpError::invalid_request("header line exceeds maximum length"));
    }
    match data.iter().position(|&b| b == b'\n') {
        Some(idx) => {
            let end = if idx > 0 && data[idx - 1] == b'\r' { idx - 1 } else { idx };
            Ok(Some((end, idx + 1)))
        }
        None => Ok(None),
    }
}

/// parses one `Name: value` header line; a line with no `:` is rejected, and so is
/// one where the colon isn't followed by exactly one SP -- the platform enforces
/// this strictly rather than tolerating arbitrary `OWS` the way RFC 7230 itself
/// permits.
pub(crate) fn parse_header_line(line: &[u8]) -> Result<Header, HttpError> {
    let text = std::str::from_utf8(line).map_err(|_| HttpError::invalid_request("header line is not valid UTF-8"))?;
    let (name, rest) = text
        .split_once(':')
        .ok_or_else(|| HttpError::invalid_request(format!("malformed header line {text:?}")))?;
    let value = rest
        .strip_prefix(' ')
        .ok_or_else(|| HttpError::invalid_request(format!("header line missing required SP after colon: {text:?}")))?;
    Ok(Header::new(name, value))
}

/// reads header lines out of `buffer` until a blank line terminates the block.
/// returns `Ok(None)` if the terminating blank line hasn't arrived yet.
pub(crate) fn try_parse_headers(buffer: &Buffer, consumed: &mut usize, headers: &mut Vec<Header>) -> Result<Option<()>, HttpError> {
    loop {
        let data = &buffer.get_data()[*consumed..];
        let Some((line_end, line_total)) = find_line(data)? else {
            return Ok(None);
        };
        if line_end == 0 {
            *consumed += line_total;
            return Ok(Some(()));
        }
        if headers.len() >= MAX_HEADERS {
            return Err(HttpError::invalid_request("too many header lines"));
        }
        headers.push(parse_header_line(&data[..line_end])?);
        *consumed += line_total;
    }
}

/// determines how the body is framed from the already-parsed header block, per
/// RFC 7230 3.3.3: a chunked `Transfer-Encoding` wins over `Content-Length`; absent
/// both, there is no body (this parser never has to guess from EOF, since every
/// message here is either length-delimited or chunked).
pub(crate) fn body_mode(headers: &[Header]) -> Result<BodyMode, HttpError> {
    let transfer_encoding = headers.iter().find(|h| h.name_eq_ignore_ascii_case("transfer-encoding"));
    if let Some(header) = transfer_encoding {
        if header.value.to_ascii_lowercase().contains("chunked") {
            return Ok(BodyMode::Chunked);
        }
    }
    match headers.iter().find(|h| h.name_eq_ignore_ascii_case("content-length")) {
        Some(header) => {
            let len = header
                .value
                .trim()
                .parse::<usize>()
                .map_err(|_| HttpError::invalid_request(format!("bad Content-Length {:?}", header.value)))?;
            Ok(BodyMode::ContentLength(len))
        }
        None => Ok(BodyMode::None),
    }
}

/// drives one step of the chunked-body state machine, appending decoded chunk
/// bytes to `body`; returns `Ok(Some(()))` once the terminating zero-size chunk and
/// its (possibly empty) trailer have both been consumed.
pub(crate) fn drive_chunked(
    buffer: &Buffer,
    consumed: &mut usize,
    state: &mut BodyState,
    body: &mut Vec<u8>,
) -> Result<Option<()>, HttpError> {
    loop {
        match state {
            BodyState::ChunkSize => {
                let data = &buffer.get_data()[*consumed..];
                let Some((line_end, line_total)) = find_line(data)? else {
                    return Ok(None);
                };
                let line = std::str::from_utf8(&data[..line_end])
                    .map_err(|_| HttpError::invalid_request("chunk size line is not valid UTF-8"))?;
                // a chunk-extension (";name=value") after the size is accepted and
                // ignored -- this parser has no use for it.
                let size_text = line.split(';').next().unwrap_or(line).trim();
                let size = usize::from_str_radix(size_text, 16)
                    .map_err(|_| HttpError::invalid_request(format!("bad chunk size {size_text:?}")))?;
                *consumed += line_total;
                *state = if size == 0 { BodyState::ChunkTrailer { headers: Vec::new() } } else { BodyState::ChunkData { remaining: size } };
            }
            BodyState::ChunkData { remaining } => {
                let data = &buffer.get_data()[*consumed..];
                let available = data.len();
                if available < *remaining + 2 {
                    if available > 0 {
                        let take = available.min(*remaining);
                        body.extend_from_slice(&data[..take]);
                        *consumed += take;
                        *remaining -= take;
                    }
                    return Ok(None);
                }
                if &data[*remaining..*remaining + 2] != b"\r\n" {
                    return Err(HttpError::invalid_request("chunk data not followed by CRLF"));
                }
                body.extend_from_slice(&data[..*remaining]);
                *consumed += *remaining + 2;
                *state = BodyState::ChunkSize;
            }
            BodyState::ChunkTrailer { headers } => {
                match try_parse_headers(buffer, consumed, headers)? {
                    Some(()) => return Ok(Some(())),
                    None => return Ok(None),
                }
            }
            BodyState::Fixed { .. } => unreachable!("drive_chunked called with a fixed-length body state"),
        }
    }
}

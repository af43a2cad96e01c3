//! the three message kinds the service protocol multiplexes over one [`Channel`]:
//! [`RecordMessage`] (fire-and-forget), [`RequestMessage`] (carries a request id),
//! and [`ResponseMessage`] (carries the same id and either a result or a remote
//! exception message). Dispatch keys on [`MessageTag`] rather than a closed Rust
//! enum: a language-neutral static tag maps onto an enum/string discriminant plus a
//! table keyed by it, which is exactly what [`crate::slots::SlotRegistry`] is.
//!
//! [`Channel`]: beam_io::Channel

use std::fmt;

/// static dispatch key for one payload type, analogous to the C++ original's
/// compile-time type tag. a small `u32` discriminant rather than a `TypeId` so the
/// tag survives serialization and is stable across processes and languages -- both
/// ends must agree on it out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageTag(pub u32);

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}

pub type RequestId = u64;

/// one-way message: `{static tag, payload}`. no reply is expected, and none of the
/// dispatcher's pending-request bookkeeping is touched handling one.
#[derive(Debug, Clone)]
pub struct RecordMessage {
    pub tag: MessageTag,
    pub payload: Vec<u8>,
}

/// `{static tag, request id, payload}`. the sender allocates `id` from its own
/// monotonically-increasing per-endpoint counter and expects exactly one matching
/// [`ResponseMessage`] carrying the same id.
#[derive(Debug, Clone)]
pub struct RequestMessage {
    pub tag: MessageTag,
    pub id: RequestId,
    pub payload: Vec<u8>,
}

/// `{static tag, request id, success flag, payload-or-exception}`. `outcome` carries
/// either the encoded result payload or a human-readable remote exception message --
/// wire format never carries a structured exception, just text.
#[derive(Debug, Clone)]
pub struct ResponseMessage {
    pub tag: MessageTag,
    pub id: RequestId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Result(Vec<u8>),
    Exception(String),
}

/// the three message kinds as sent on the wire, after the codec has already told
/// them apart. a `Codec` impl decodes exactly one `Frame` per call to
/// [`Codec::decode`]; it does not itself know how many bytes a frame will need,
/// which is why `decode` takes the whole available buffer and reports "not enough
/// yet" the same way [`beam_http`](beam_http)'s parsers do (`Ok(None)`).
#[derive(Debug, Clone)]
pub enum Frame {
    Record(RecordMessage),
    Request(RequestMessage),
    Response(ResponseMessage),
}

/// pluggable wire format for service-protocol messages: binary and JSON
/// serializations are equally admissible at this layer -- a codec is the seam that
/// lets both coexist without either leaking into [`crate::dispatcher::Dispatcher`]
/// or [`crate::client::ServiceClient`].
pub trait Codec: Send + Sync + 'static {
    /// encodes one frame, length-prefixed so [`decode`](Codec::decode) can tell where
    /// it ends without re-parsing the payload.
    fn encode(&self, frame: &Frame) -> Vec<u8>;

    /// attempts to decode one frame from the front of `buf`. returns `Ok(Some((frame,
    /// consumed)))` on success, `Ok(None)` if `buf` does not yet hold a complete
    /// frame, or `Err` if the bytes present can never form a valid frame.
    fn decode(&self, buf: &[u8]) -> Result<Option<(Frame, usize)>, crate::error::RpcError>;
}

/// length-prefixed binary codec: `[kind: u8][tag: u32][...kind-specific fields]`,
/// all integers little-endian, request/response payloads themselves length-prefixed
/// `u32`. grounded on the length-prefixing convention `beam_io::Channel`'s framing
/// neighbors (`beam-http`'s `Content-Length` framing) already use for "how much more
/// do I need to read before this is a complete unit" -- restated here because the
/// service protocol has no headers section to carry a length in.
pub struct BinaryCodec;

const KIND_RECORD: u8 = 0;
const KIND_REQUEST: u8 = 1;
const KIND_RESPONSE_OK: u8 = 2;
const KIND_RESPONSE_ERR: u8 = 3;

impl Codec for BinaryCodec {
    fn encode(&self, frame: &Frame) -> Vec<u8> {
        let mut out = Vec::new();
        match frame {
            Frame::Record(m) => {
                out.push(KIND_RECORD);
                out.extend_from_slice(&m.tag.0.to_le_bytes());
                write_payload(&mut out, &m.payload);
            }
            Frame::Request(m) => {
                out.push(KIND_REQUEST);
                out.extend_from_slice(&m.tag.0.to_le_bytes());
                out.extend_from_slice(&m.id.to_le_bytes());
                write_payload(&mut out, &m.payload);
            }
            Frame::Response(m) => match &m.outcome {
                Outcome::Result(payload) => {
                    out.push(KIND_RESPONSE_OK);
                    out.extend_from_slice(&m.tag.0.to_le_bytes());
                    out.extend_from_slice(&m.id.to_le_bytes());
                    write_payload(&mut out, payload);
                }
                Outcome::Exception(message) => {
                    out.push(KIND_RESPONSE_ERR);
                    out.extend_from_slice(&m.tag.0.to_le_bytes());
                    out.extend_from_slice(&m.id.to_le_bytes());
                    write_payload(&mut out, message.as_bytes());
                }
            },
        }
        out
    }

    fn decode(&self, buf: &[u8]) -> Result<Option<(Frame, usize)>, crate::error::RpcError> {
        if buf.is_empty() {
            return Ok(None);
        }
        let kind = buf[0];
        let rest = &buf[1..];
        match kind {
            KIND_RECORD => {
                let Some((tag, rest)) = read_u32(rest) else { return Ok(None) };
                let Some((payload, consumed)) = read_payload(rest) else { return Ok(None) };
                Ok(Some((Frame::Record(RecordMessage { tag: MessageTag(tag), payload }), 1 + 4 + consumed)))
            }
            KIND_REQUEST => {
                let Some((tag, rest)) = read_u32(rest) else { return Ok(None) };
                let Some((id, rest)) = read_u64(rest) else { return Ok(None) };
                let Some((payload, consumed)) = read_payload(rest) else { return Ok(None) };
                Ok(Some((Frame::Request(RequestMessage { tag: MessageTag(tag), id, payload }), 1 + 4 + 8 + consumed)))
            }
            KIND_RESPONSE_OK | KIND_RESPONSE_ERR => {
                let Some((tag, rest)) = read_u32(rest) else { return Ok(None) };
                let Some((id, rest)) = read_u64(rest) else { return Ok(None) };
                let Some((payload, consumed)) = read_payload(rest) else { return Ok(None) };
                let outcome = if kind == KIND_RESPONSE_OK {
                    Outcome::Result(payload)
                } else {
                    Outcome::Exception(String::from_utf8_lossy(&payload).into_owned())
                };
                Ok(Some((Frame::Response(ResponseMessage { tag: MessageTag(tag), id, outcome }), 1 + 4 + 8 + consumed)))
            }
            _ => Err(crate::error::RpcError::Codec(format!("unknown frame kind {kind}"))),
        }
    }
}

fn write_payload(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn read_u32(buf: &[u8]) -> Option<(u32, &[u8])> {
    if buf.len() < 4 {
        return None;
    }
    let (head, tail) = buf.split_at(4);
    Some((u32::from_le_bytes(head.try_into().unwrap()), tail))
}

fn read_u64(buf: &[u8]) -> Option<(u64, &[u8])> {
    if buf.len() < 8 {
        return None;
    }
    let (head, tail) = buf.split_at(8);
    Some((u64::from_le_bytes(head.try_into().unwrap()), tail))
}

fn read_payload(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    let (len, rest) = read_u32(buf)?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some((rest[..len].to_vec(), 4 + len))
}

/// JSON variant of the same framing, for deployments that prefer a human-readable
/// wire format over the binary one; payload bytes are themselves opaque to this
/// codec (callers serialize their own request/response types into `payload` with
/// `serde_json` before handing a `Frame` to [`Codec::encode`]).
#[cfg(feature = "json")]
pub struct JsonCodec;

#[cfg(feature = "json")]
#[derive(serde::Serialize, serde::Deserialize)]
enum WireFrame {
    Record { tag: u32, payload: Vec<u8> },
    Request { tag: u32, id: RequestId, payload: Vec<u8> },
    ResponseOk { tag: u32, id: RequestId, payload: Vec<u8> },
    ResponseErr { tag: u32, id: RequestId, message: String },
}

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, frame: &Frame) -> Vec<u8> {
        let wire = match frame {
            Frame::Record(m) => WireFrame::Record { tag: m.tag.0, payload: m.payload.clone() },
            Frame::Request(m) => WireFrame::Request { tag: m.tag.0, id: m.id, payload: m.payload.clone() },
            Frame::Response(m) => match &m.outcome {
                Outcome::Result(payload) => WireFrame::ResponseOk { tag: m.tag.0, id: m.id, payload: payload.clone() },
                Outcome::Exception(message) => WireFrame::ResponseErr { tag: m.tag.0, id: m.id, message: message.clone() },
            },
        };
        let mut body = serde_json::to_vec(&wire).expect("WireFrame serialization cannot fail");
        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.append(&mut body);
        out
    }

    fn decode(&self, buf: &[u8]) -> Result<Option<(Frame, usize)>, crate::error::RpcError> {
        let Some((len, rest)) = read_u32(buf) else { return Ok(None) };
        let len = len as usize;
        if rest.len() < len {
            return Ok(None);
        }
        let wire: WireFrame = serde_json::from_slice(&rest[..len]).map_err(|e| crate::error::RpcError::Codec(e.to_string()))?;
        let frame = match wire {
            WireFrame::Record { tag, payload } => Frame::Record(RecordMessage { tag: MessageTag(tag), payload }),
            WireFrame::Request { tag, id, payload } => Frame::Request(RequestMessage { tag: MessageTag(tag), id, payload }),
            WireFrame::ResponseOk { tag, id, payload } => {
                Frame::Response(ResponseMessage { tag: MessageTag(tag), id, outcome: Outcome::Result(payload) })
            }
            WireFrame::ResponseErr { tag, id, message } => {
                Frame::Response(ResponseMessage { tag: MessageTag(tag), id, outcome: Outcome::Exception(message) })
            }
        };
        Ok(Some((frame, 4 + len)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binary_round_trips_record() {
        let codec = BinaryCodec;
        let frame = Frame::Record(RecordMessage { tag: MessageTag(7), payload: b"hello".to_vec() });
        let bytes = codec.encode(&frame);
        let (decoded, consumed) = codec.decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        match decoded {
            Frame::Record(m) => {
                assert_eq!(m.tag, MessageTag(7));
                assert_eq!(m.payload, b"hello");
            }
            _ => panic!("expected record"),
        }
    }

    #[test]
    fn binary_round_trips_request_and_response() {
        let codec = BinaryCodec;
        let req = Frame::Request(RequestMessage { tag: MessageTag(1), id: 42, payload: b"params".to_vec() });
        let bytes = codec.encode(&req);
        let (decoded, consumed) = codec.decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(matches!(decoded, Frame::Request(m) if m.id == 42));

        let resp = Frame::Response(ResponseMessage { tag: MessageTag(1), id: 42, outcome: Outcome::Exception("boom".into()) });
        let bytes = codec.encode(&resp);
        let (decoded, _) = codec.decode(&bytes).unwrap().unwrap();
        match decoded {
            Frame::Response(m) => assert!(matches!(m.outcome, Outcome::Exception(ref s) if s == "boom")),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn binary_decode_reports_incomplete_frame() {
        let codec = BinaryCodec;
        let frame = Frame::Record(RecordMessage { tag: MessageTag(1), payload: b"abc".to_vec() });
        let bytes = codec.encode(&frame);
        assert!(codec.decode(&bytes[..bytes.len() - 1]).unwrap().is_none());
    }

    #[test]
    fn binary_decode_rejects_unknown_kind() {
        let codec = BinaryCodec;
        assert!(codec.decode(&[255, 0, 0, 0, 0]).is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_round_trips_request() {
        let codec = JsonCodec;
        let frame = Frame::Request(RequestMessage { tag: MessageTag(3), id: 9, payload: b"\"x\"".to_vec() });
        let bytes = codec.encode(&frame);
        let (decoded, consumed) = codec.decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(matches!(decoded, Frame::Request(m) if m.id == 9 && m.tag == MessageTag(3)));
    }
}

//! HTTP/1.x message model, wire encoding, and incremental parsers.
//!
//! This crate intentionally does not depend on a general-purpose HTTP parsing
//! crate: the value types (`Uri`, `Cookie`, `Header`) and the request/response
//! parsers are hand-rolled against the specific subset of HTTP/1.0 and HTTP/1.1
//! this platform speaks, so their error cases match the platform's own
//! `HttpError` rather than a third-party crate's.

pub mod cookie;
pub mod encode;
pub mod error;
pub mod header;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod uri;
pub mod version;

pub use cookie::Cookie;
pub use encode::{encode_request, encode_response};
pub use error::HttpError;
pub use header::{Connection, Header, SpecialHeaders};
pub use parser::{request::HttpRequestParser, response::HttpResponseParser};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use status::StatusCode;
pub use uri::Uri;
pub use version::{Method, Version};

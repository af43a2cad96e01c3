//! connection-reusing HTTP client keyed by `(host, port)`, with a per-host cookie
//! jar and an injected channel builder so plain TCP, TLS, or an in-process duplex
//! pair (for tests) can all stand in for the transport. grounded on `xitca-client`.

mod builder;
mod client;
mod cookie_jar;
mod error;
mod pool;

pub use builder::ClientBuilder;
pub use client::HttpClient;
pub use error::ClientError;

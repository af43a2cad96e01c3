//! `HttpClient`: a connection-reusing client keyed by `(host, port)` with a per-host
//! cookie jar, grounded on `xitca-client`'s `Client`/`connect.rs`/`pool.rs` but
//! simplified to a single-entry-per-host pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use beam_http::{encode_request, HttpRequest, HttpResponseParser};
use beam_io::{Buffer, Channel};

use crate::cookie_jar::CookieJar;
use crate::error::ClientError;
use crate::pool::{ConnectionPool, PoolKey};

pub(crate) type ChannelBuilder =
    Arc<dyn Fn(beam_http::Uri) -> Pin<Box<dyn Future<Output = Result<Channel, beam_io::Error>> + Send>> + Send + Sync>;

/// connection-reusing HTTP client. holds at most one live [`Channel`] per
/// `(host, port)` key and a cookie jar shared across every host it has talked to.
pub struct HttpClient {
    channel_builder: ChannelBuilder,
    #[allow(dead_code)]
    connect_timeout: Duration,
    #[allow(dead_code)]
    request_timeout: Duration,
    pool: ConnectionPool,
    cookies: CookieJar,
}

impl HttpClient {
    pub fn new() -> Self {
        crate::builder::ClientBuilder::new().build()
    }

    pub(crate) fn from_parts(channel_builder: ChannelBuilder, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            channel_builder,
            connect_timeout,
            request_timeout,
            pool: ConnectionPool::new(),
            cookies: CookieJar::new(),
        }
    }

    /// sends `request`, reusing the cached channel for its `(host, port)` if one is
    /// live, retrying once on a write failure against a reused channel and then
    /// giving up.
    pub async fn send(&self, request: HttpRequest) -> Result<beam_http::HttpResponse, ClientError> {
        let key = PoolKey { host: request.uri.hostname.clone(), port: request.uri.port };

        let mut request = request;
        request.cookies = self.cookies.merge_into(&key.host, request.cookies);

        let encoded = encode_request(&request);

        let (channel, reused) = match self.pool.take(&key) {
            Some(channel) => (channel, true),
            None => (self.connect(&request.uri).await?, false),
        };

        let mut channel = channel;
        match channel.writer().write(encoded.clone()).await {
            Ok(()) => {}
            Err(_) if reused => {
                // the cached channel's peer closed it out from under us; build a
                // fresh one and retry exactly once.
                self.pool.evict(&key);
                let mut fresh = self.connect(&request.uri).await?;
                fresh.writer().write(encoded).await.map_err(ClientError::Io)?;
                channel = fresh;
            }
            Err(cause) => {
                self.pool.evict(&key);
                return Err(ClientError::Io(cause));
            }
        }

        let response = match self.read_response(&mut channel).await {
            Ok(response) => response,
            Err(cause) => {
                self.pool.evict(&key);
                return Err(cause);
            }
        };

        self.cookies.store(&key.host, &response.cookies);

        let keep_alive = match response.get_header("Connection") {
            Some(value) => value.eq_ignore_ascii_case("keep-alive"),
            None => response.version != beam_http::Version::HTTP_10,
        };

        if keep_alive {
            self.pool.put(key, channel);
        } else {
            channel.close().await;
            self.pool.evict(&key);
        }

        Ok(response)
    }

    async fn connect(&self, uri: &beam_http::Uri) -> Result<Channel, ClientError> {
        (self.channel_builder)(uri.clone()).await.map_err(ClientError::Connect)
    }

    async fn read_response(&self, channel: &mut Channel) -> Result<beam_http::HttpResponse, ClientError> {
        let mut parser = HttpResponseParser::new();
        let mut buf = Buffer::new();
        loop {
            if let Some(response) = parser.get_next().map_err(ClientError::Protocol)? {
                return Ok(response);
            }
            buf.shrink(buf.get_size());
            let n = channel.read(&mut buf, 8 * 1024).await.map_err(ClientError::Io)?;
            parser.feed(&buf.get_data()[..n]);
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

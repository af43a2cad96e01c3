//! `ClientBuilder`: configures an [`HttpClient`](crate::client::HttpClient) before
//! construction, mirroring `xitca-client`'s builder-then-build pattern
//! (`client/src/builder.rs`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use beam_http::Uri;
use beam_io::Channel;

use crate::client::{ChannelBuilder, HttpClient};

type BoxChannelFuture = Pin<Box<dyn Future<Output = Result<Channel, beam_io::Error>> + Send>>;

pub struct ClientBuilder {
    connect_timeout: Duration,
    request_timeout: Duration,
    channel_builder: Option<ChannelBuilder>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            channel_builder: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// overrides how a [`Channel`] is established for a given `Uri`. the default
    /// dials plain TCP via [`beam_io::tcp::connect`]; tests typically inject an
    /// in-process duplex pair instead (see [`beam_io::duplex::pair`]), which is the
    /// whole reason channel construction is delegated to an injected builder rather
    /// than hard-coded against `TcpStream`.
    pub fn channel_builder<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Uri) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Channel, beam_io::Error>> + Send + 'static,
    {
        self.channel_builder = Some(Arc::new(move |uri| Box::pin(f(uri)) as BoxChannelFuture));
        self
    }

    pub fn build(self) -> HttpClient {
        let channel_builder = self.channel_builder.unwrap_or_else(|| Arc::new(default_channel_builder) as ChannelBuilder);
        HttpClient::from_parts(channel_builder, self.connect_timeout, self.request_timeout)
    }
}

fn default_channel_builder(uri: Uri) -> BoxChannelFuture {
    Box::pin(async move { beam_io::tcp::connect((uri.hostname.clone(), uri.port)).await })
}

//! a Channel backed by a real TCP socket.

use std::sync::Arc;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::{
    channel::Channel,
    stream::{CloseSignal, StreamConnection, StreamReader, StreamWriter},
    Error,
};

/// connects to `addr` and wraps the resulting socket as a [`Channel`]. this is the
/// default channel builder `beam-client`'s `HttpClient` plugs in for plain (non-TLS)
/// `http://` URIs.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Channel, Error> {
    let stream = TcpStream::connect(addr).await.map_err(Error::Connect)?;
    Ok(from_stream(stream))
}

/// wraps an already-established [`TcpStream`] (e.g. one accepted by a listener) as a
/// [`Channel`].
pub fn from_stream(stream: TcpStream) -> Channel {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();

    let signal = CloseSignal::new();
    let write_half = Arc::new(tokio::sync::Mutex::new(write_half));

    Channel::new(
        Box::new(StreamConnection::new(signal.clone(), write_half.clone())),
        Box::new(StreamReader::new(read_half, signal.clone())),
        Box::new(StreamWriter::new(write_half, signal)),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::Buffer;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_and_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut channel = from_stream(stream);
            let mut buf = Buffer::new();
            channel.read(&mut buf, 1024).await.unwrap();
            channel.writer().write(buf.get_data().to_vec()).await.unwrap();
        });

        let mut client = connect(addr).await.unwrap();
        client.writer().write(b"ping".to_vec()).await.unwrap();

        let mut buf = Buffer::new();
        client.read(&mut buf, 1024).await.unwrap();
        assert_eq!(buf.get_data(), b"ping");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused_surfaces_connect_error() {
        // port 0 after a bind-then-drop is not guaranteed free, so instead bind and
        // immediately drop the listener to get a deterministically-refusing port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(addr).await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }
}

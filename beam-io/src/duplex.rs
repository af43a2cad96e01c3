//! an in-process, pipe-backed Channel pair -- two endpoints that talk directly to
//! each other without touching a real socket. used by `beam-http`/`beam-client`/
//! `beam-rpc`'s tests as the injected channel builder, and by anything that wants a
//! `Channel` without opening a port.

use std::sync::Arc;

use tokio::io::split;

use crate::{
    channel::Channel,
    stream::{CloseSignal, StreamConnection, StreamReader, StreamWriter},
};

/// builds a connected pair of [`Channel`]s; bytes written to one are read from the
/// other. `buffer_size` bounds how many unread bytes `tokio::io::duplex` will hold
/// before a writer blocks.
pub fn pair(buffer_size: usize) -> (Channel, Channel) {
    let (a, b) = tokio::io::duplex(buffer_size);

    let (a_read, a_write) = split(a);
    let (b_read, b_write) = split(b);

    let a_signal = CloseSignal::new();
    let b_signal = CloseSignal::new();

    let a_write = Arc::new(tokio::sync::Mutex::new(a_write));
    let b_write = Arc::new(tokio::sync::Mutex::new(b_write));

    let channel_a = Channel::new(
        Box::new(StreamConnection::new(a_signal.clone(), a_write.clone())),
        Box::new(StreamReader::new(a_read, a_signal.clone())),
        Box::new(StreamWriter::new(a_write, a_signal)),
    );
    let channel_b = Channel::new(
        Box::new(StreamConnection::new(b_signal.clone(), b_write.clone())),
        Box::new(StreamReader::new(b_read, b_signal.clone())),
        Box::new(StreamWriter::new(b_write, b_signal)),
    );

    (channel_a, channel_b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::Buffer;

    #[tokio::test]
    async fn writes_on_one_side_read_on_the_other() {
        let (mut a, mut b) = pair(4096);
        a.writer().write(b"hello".to_vec()).await.unwrap();

        let mut buf = Buffer::new();
        let n = b.read(&mut buf, 1024).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf.get_data(), b"hello");
    }

    #[tokio::test]
    async fn close_breaks_pending_read_with_eof() {
        let (a, mut b) = pair(4096);
        let reader = tokio::spawn(async move {
            let mut buf = Buffer::new();
            b.read(&mut buf, 1024).await
        });
        tokio::task::yield_now().await;
        a.close().await;

        let result = reader.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn write_after_close_fails() {
        let (a, _b) = pair(4096);
        a.close().await;
        let result = a.writer().write(b"x".to_vec()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (a, _b) = pair(4096);
        a.close().await;
        a.close().await;
        assert!(a.is_closed());
    }
}

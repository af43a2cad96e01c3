//! shared plumbing behind both the TCP and in-memory duplex transports: a
//! `CloseSignal` that every read/write races against so `Connection::close()` makes
//! in-flight and subsequent operations fail with `Error::EndOfFile`, regardless of
//! which concrete `AsyncRead`/`AsyncWrite` implementation backs them.

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Notify,
};

use crate::{buffer::Buffer, channel, Error};

pub(crate) struct CloseSignal {
    closed: AtomicBool,
    notify: Notify,
}

impl CloseSignal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn trigger(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// resolves once `trigger()` has been (or already was) called. constructing the
    /// `notified()` future before checking the flag is the pattern `tokio::sync::
    /// Notify`'s docs call out as race-free: a `trigger()` landing between the check
    /// and the await is still observed.
    pub(crate) async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

pub(crate) struct StreamReader<R> {
    half: R,
    signal: Arc<CloseSignal>,
}

impl<R> StreamReader<R> {
    pub(crate) fn new(half: R, signal: Arc<CloseSignal>) -> Self {
        Self { half, signal }
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> channel::Reader for StreamReader<R> {
    async fn read(&mut self, out: &mut Buffer, max: usize) -> Result<usize, Error> {
        if self.signal.is_closed() {
            return Err(Error::EndOfFile);
        }
        let mut tmp = vec![0u8; max.max(1)];
        tokio::select! {
            biased;
            _ = self.signal.wait() => Err(Error::EndOfFile),
            result = self.half.read(&mut tmp) => {
                let n = result?;
                if n == 0 {
                    return Err(Error::EndOfFile);
                }
                out.append(&tmp[..n]);
                Ok(n)
            }
        }
    }
}

/// write half shared between [`StreamWriter`] (the actual writes) and
/// [`StreamConnection`] (which needs to call `shutdown()` on close) -- a single
/// underlying `W` can't be split twice, so both sides hold an `Arc<Mutex<W>>` onto
/// the same handle rather than each owning a distinct one.
pub(crate) type SharedWriteHalf<W> = Arc<tokio::sync::Mutex<W>>;

pub(crate) struct StreamWriter<W> {
    half: SharedWriteHalf<W>,
    signal: Arc<CloseSignal>,
}

impl<W> StreamWriter<W> {
    pub(crate) fn new(half: SharedWriteHalf<W>, signal: Arc<CloseSignal>) -> Self {
        Self { half, signal }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> channel::Writer for StreamWriter<W> {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.signal.is_closed() {
            return Err(Error::EndOfFile);
        }
        let mut half = self.half.lock().await;
        tokio::select! {
            biased;
            _ = self.signal.wait() => Err(Error::EndOfFile),
            result = half.write_all(data) => Ok(result?),
        }
    }
}

pub(crate) struct StreamConnection<W> {
    signal: Arc<CloseSignal>,
    half: SharedWriteHalf<W>,
}

impl<W> StreamConnection<W> {
    pub(crate) fn new(signal: Arc<CloseSignal>, half: SharedWriteHalf<W>) -> Self {
        Self { signal, half }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> channel::Connection for StreamConnection<W> {
    async fn close(&self) {
        self.signal.trigger();
        let _ = self.half.lock().await.shutdown().await;
    }

    fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

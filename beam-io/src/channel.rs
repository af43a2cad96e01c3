//! the Channel abstraction: `{Identifier, Connection, Reader, Writer}` bundled behind
//! trait objects so any transport -- TCP, an in-process duplex pair used in tests, or
//! (outside this crate) TLS -- can be plugged into `beam-http`'s client and
//! `beam-rpc`'s dispatcher without either of them knowing which one it is. grounded
//! on `xitca-io::net::Stream`'s enum-of-transports pattern (`io/src/net.rs`),
//! generalized here to a trait rather than a closed enum since `beam-rpc`'s service
//! client needs to plug in transports this crate doesn't know about via an injected
//! channel builder.

use std::{fmt, sync::Arc};

use beam_core::TaskRunner;

use crate::{buffer::Buffer, Error};

/// opaque identity for one Channel instance, for logging/diagnostics -- a
/// process-wide sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(u64);

impl Identifier {
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({})", self.0)
    }
}

/// closes the underlying transport. idempotent: a second `close()` is a no-op, and
/// every operation on a closed Connection (including reads/writes already in
/// progress) observes the closure as an end-of-file failure.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn close(&self);
    fn is_closed(&self) -> bool;
}

/// reads bytes off the transport. only one read may be outstanding at a time per
/// Reader -- enforced here by requiring `&mut self` plus the Reader being owned
/// behind a single `Channel`, so a second concurrent call can't even be expressed.
#[async_trait::async_trait]
pub trait Reader: Send {
    /// appends up to `max` bytes to `out`, returning how many were appended. returns
    /// `Err(Error::EndOfFile)` once the peer has closed its write side or the
    /// Connection has been closed.
    async fn read(&mut self, out: &mut Buffer, max: usize) -> Result<usize, Error>;
}

/// writes bytes to the transport. `Channel::write` below is the only supported entry
/// point: it enqueues through a per-Channel [`TaskRunner`] so concurrent writers are
/// serialized FIFO without each `Writer` implementation needing its own
/// serialization.
#[async_trait::async_trait]
pub trait Writer: Send {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), Error>;
}

struct Shared {
    id: Identifier,
    connection: Box<dyn Connection>,
    writer: tokio::sync::Mutex<Box<dyn Writer>>,
    write_runner: TaskRunner,
}

/// bundle of `{Identifier, Connection, Reader, Writer}` over one bidirectional byte
/// stream. `Reader` is held separately (not behind the shared `Arc`) since at most
/// one read may be outstanding and reads are always issued from the single routine
/// that owns the Channel's read side; `Connection` and `Writer` are shared so any
/// number of routines may hold a cloned handle and write concurrently, with ordering
/// preserved by the per-Channel [`TaskRunner`].
pub struct Channel {
    shared: Arc<Shared>,
    reader: Box<dyn Reader>,
}

impl Channel {
    pub fn new(connection: Box<dyn Connection>, reader: Box<dyn Reader>, writer: Box<dyn Writer>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Identifier::next(),
                connection,
                writer: tokio::sync::Mutex::new(writer),
                write_runner: TaskRunner::new(),
            }),
            reader,
        }
    }

    pub fn id(&self) -> Identifier {
        self.shared.id
    }

    pub fn is_closed(&self) -> bool {
        self.shared.connection.is_closed()
    }

    pub async fn close(&self) {
        self.shared.connection.close().await;
    }

    /// reads up to `max` bytes into `out`. only the Channel's owner can call this
    /// (the Reader is not shared), which is what enforces at most one outstanding
    /// read.
    pub async fn read(&mut self, out: &mut Buffer, max: usize) -> Result<usize, Error> {
        if self.shared.connection.is_closed() {
            return Err(Error::EndOfFile);
        }
        self.reader.read(out, max).await
    }

    /// a cloneable write handle sharing this Channel's serialized Writer. writes
    /// submitted from different routines via different clones are still delivered
    /// in first-enqueued-first-written order.
    pub fn writer(&self) -> ChannelWriter {
        ChannelWriter { shared: self.shared.clone() }
    }
}

/// a write-only handle sharing a Channel's connection and serialized writer; cheap to
/// clone (one `Arc` bump), so it can be handed to every routine that needs to send on
/// a Channel without handing out the Channel itself.
#[derive(Clone)]
pub struct ChannelWriter {
    shared: Arc<Shared>,
}

impl ChannelWriter {
    pub fn id(&self) -> Identifier {
        self.shared.id
    }

    pub fn is_closed(&self) -> bool {
        self.shared.connection.is_closed()
    }

    pub async fn close(&self) {
        self.shared.connection.close().await;
    }

    /// enqueues `data` for writing, serialized against every other write submitted
    /// through any clone of this handle via the Channel's [`TaskRunner`]. resolves
    /// once this write has actually been issued against the transport (success or
    /// failure); `Err` carries the transport's failure (e.g. a broken pipe).
    pub async fn write(&self, data: Vec<u8>) -> Result<(), Error> {
        if self.shared.connection.is_closed() {
            return Err(Error::EndOfFile);
        }
        let shared = self.shared.clone();
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        self.shared
            .write_runner
            .add(async move {
                let mut writer = shared.writer.lock().await;
                let outcome = writer.write_all(&data).await;
                let _ = result_tx.send(outcome);
            })
            .await;
        result_rx.await.expect("write task always sends before completing")
    }
}

//! growable contiguous byte container with suffix-append, grow/shrink and zero-copy
//! slicing, plus [`SharedBuffer`], its reference-counted variant for passing
//! ownership across routines without copying. grounded on `bytes::BytesMut`/`Bytes`,
//! wrapped in a `get_data`/`append`/`grow`/`shrink`/`get_mutable_suffix` API.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// a contiguous, growable byte buffer. thin wrapper over `bytes::BytesMut` exposing
/// that operation set explicitly.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    inner: BytesMut,
}

impl Buffer {
    pub fn new() -> Self {
        Self { inner: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: BytesMut::with_capacity(capacity) }
    }

    pub fn get_data(&self) -> &[u8] {
        &self.inner
    }

    pub fn get_size(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// appends `data` to the tail.
    pub fn append(&mut self, data: &[u8]) {
        self.inner.put_slice(data);
    }

    /// reserves `n` bytes at the tail, zero-filled, and returns how many were
    /// actually added (always `n` for this in-memory implementation; the signature
    /// leaves room for a backing store that can grow by less than requested).
    pub fn grow(&mut self, n: usize) -> usize {
        self.inner.put_bytes(0, n);
        n
    }

    /// drops `n` bytes from the tail. `n` beyond the current length truncates to
    /// empty rather than panicking, for forgiving callers.
    pub fn shrink(&mut self, n: usize) {
        let new_len = self.inner.len().saturating_sub(n);
        self.inner.truncate(new_len);
    }

    /// consumes (drops) `n` bytes from the *front*, used by the HTTP parser's buffer
    /// discipline: after a token is consumed it is erased from the front of the
    /// internal buffer.
    pub fn consume_front(&mut self, n: usize) {
        self.inner.advance(n.min(self.inner.len()));
    }

    /// a mutable view of `length` bytes starting at `offset` bytes from the current
    /// end, growing the buffer first if `offset + length` would otherwise run past
    /// it.
    pub fn get_mutable_suffix(&mut self, offset: usize, length: usize) -> &mut [u8] {
        let end = self.inner.len();
        let start = end.saturating_sub(offset);
        let needed = (start + length).saturating_sub(self.inner.len());
        if needed > 0 {
            self.grow(needed);
        }
        &mut self.inner[start..start + length]
    }

    /// freezes the current contents into an immutable, reference-counted
    /// [`SharedBuffer`] without copying.
    pub fn into_shared(self) -> SharedBuffer {
        SharedBuffer { inner: self.inner.freeze() }
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self { inner: BytesMut::from(&data[..]) }
    }
}

impl Extend<u8> for Buffer {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

/// reference-counted, immutable byte buffer -- cloning is an `Arc`-style refcount
/// bump, not a copy. used to hand a completed message body across a routine boundary
/// (e.g. into a `Queue<SharedBuffer>`) without duplicating the bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SharedBuffer {
    inner: Bytes,
}

impl SharedBuffer {
    pub fn get_data(&self) -> &[u8] {
        &self.inner
    }

    pub fn get_size(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// zero-copy sub-slice sharing the same backing allocation.
    pub fn slice(&self, range: std::ops::Range<usize>) -> SharedBuffer {
        SharedBuffer { inner: self.inner.slice(range) }
    }
}

impl From<Vec<u8>> for SharedBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { inner: Bytes::from(data) }
    }
}

impl From<Bytes> for SharedBuffer {
    fn from(inner: Bytes) -> Self {
        Self { inner }
    }
}

impl From<&'static [u8]> for SharedBuffer {
    fn from(data: &'static [u8]) -> Self {
        Self { inner: Bytes::from_static(data) }
    }
}

//! multi-producer single-consumer blocking queue with explicit close/break support.
//! `pop` is a suspension point: it parks the calling routine until an item arrives or
//! the queue is closed and drained, at which point it fails with [`QueueClosed`].

use std::{
    collections::VecDeque,
    error::Error,
    fmt,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};

/// raised by [`Queue::pop`] once the queue has been closed and fully drained, and by
/// [`Queue::push`] against an already-closed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is closed")
    }
}

impl Error for QueueClosed {}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
    waiters: VecDeque<Waker>,
}

/// an MPSC queue. cloning a `Queue` shares the same backing storage, so any clone can
/// push and any clone can pop -- callers are expected to use at most one consumer, per
/// the "single-consumer" half of the contract, but nothing here enforces it.
pub struct Queue<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// pushes a value onto the back of the queue. fails if the queue has already been
    /// closed.
    pub fn push(&self, value: T) -> Result<(), QueueClosed> {
        let waiter = {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return Err(QueueClosed);
            }
            inner.items.push_back(value);
            inner.waiters.pop_front()
        };
        if let Some(waiter) = waiter {
            waiter.wake();
        }
        Ok(())
    }

    /// suspends the caller until an item is available, or fails once the queue is
    /// closed and empty.
    pub async fn pop(&self) -> Result<T, QueueClosed> {
        std::future::poll_fn(|cx| self.poll_pop(cx)).await
    }

    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<Result<T, QueueClosed>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(value) = inner.items.pop_front() {
            return Poll::Ready(Ok(value));
        }
        if inner.closed {
            return Poll::Ready(Err(QueueClosed));
        }
        inner.waiters.push_back(cx.waker().clone());
        Poll::Pending
    }

    /// marks the queue closed. items already pushed may still be popped; once drained,
    /// every pending and future `pop` fails with [`QueueClosed`].
    pub fn close(&self) {
        let waiters = {
            let mut inner = self.inner.lock().unwrap();
            inner.closed = true;
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            waiter.wake();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn push_then_pop() {
        let q = Queue::new();
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.pop().await.unwrap(), 1);
        assert_eq!(q.pop().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pop_blocks_until_push() {
        let q: Queue<i32> = Queue::new();
        let q2 = q.clone();
        let consumer = tokio::spawn(async move { q2.pop().await });

        tokio::task::yield_now().await;
        q.push(9).unwrap();

        assert_eq!(consumer.await.unwrap().unwrap(), 9);
    }

    #[tokio::test]
    async fn close_drains_then_breaks() {
        let q = Queue::new();
        q.push(1).unwrap();
        q.close();

        assert_eq!(q.pop().await.unwrap(), 1);
        assert_eq!(q.pop().await.unwrap_err(), QueueClosed);
        assert!(q.push(2).is_err());
    }

    #[tokio::test]
    async fn close_wakes_pending_pop() {
        let q: Queue<i32> = Queue::new();
        let q2 = q.clone();
        let consumer = tokio::spawn(async move { q2.pop().await });

        tokio::task::yield_now().await;
        q.close();

        assert_eq!(consumer.await.unwrap().unwrap_err(), QueueClosed);
    }
}

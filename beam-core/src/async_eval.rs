//! single-shot future/promise pair. a routine blocked in [`Async::get`] is woken once
//! the matching [`Eval`] is set, in FIFO order with every other waiter on the same
//! `Async`.

use std::{
    collections::VecDeque,
    fmt, mem,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Complete,
    Exception,
}

struct Inner<T, E> {
    state: State,
    value: Option<T>,
    exception: Option<E>,
    waiters: VecDeque<Waker>,
}

impl<T, E> Inner<T, E> {
    fn new() -> Self {
        Self {
            state: State::Pending,
            value: None,
            exception: None,
            waiters: VecDeque::new(),
        }
    }
}

/// a single-shot synchronization cell. at most one [`Eval`] exists per `Async` at a
/// time; `get` suspends the calling routine until the value or exception is set.
pub struct Async<T, E = crate::Error> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for Async<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Async<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap().state;
        f.debug_struct("Async").field("state", &state).finish()
    }
}

impl<T, E> Default for Async<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Async<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    /// returns an [`Eval`] that can set this `Async`'s result exactly once. calling
    /// this more than once is legal -- it's a "first writer wins" fan-in -- and each
    /// `Eval::set`/`set_exception` is a no-op once the `Async` has already
    /// transitioned out of `Pending`.
    pub fn get_eval(&self) -> Eval<T, E> {
        Eval {
            inner: self.inner.clone(),
        }
    }

    /// suspends the calling task until the value is set, then returns a clone. requires
    /// `T: Clone` because multiple waiters may observe the same completed value.
    pub async fn get(&self) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        std::future::poll_fn(|cx| self.poll_get(cx)).await
    }

    fn poll_get(&self, cx: &mut Context<'_>) -> Poll<Result<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Pending => {
                inner.waiters.push_back(cx.waker().clone());
                Poll::Pending
            }
            State::Complete => Poll::Ready(Ok(inner.value.clone().expect("complete Async missing value"))),
            State::Exception => Poll::Ready(Err(inner.exception.clone().expect("exception Async missing cause"))),
        }
    }

    /// resets the `Async` back to `Pending` so it can be reused. the caller must
    /// guarantee there are no outstanding waiters and no concurrent setter racing this
    /// call -- an unenforced precondition, not one this type checks for.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = State::Pending;
        inner.value = None;
        inner.exception = None;
        inner.waiters.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().unwrap().state == State::Pending
    }
}

/// unique handle that can set the value or exception of exactly one [`Async`]. moving
/// an `Eval` transfers ownership; dropping one that was never set leaves the `Async`
/// `Pending` forever (the caller must arrange for that not to matter, e.g. by closing
/// the resource the waiter is parked on).
pub struct Eval<T, E = crate::Error> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> fmt::Debug for Eval<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eval").finish()
    }
}

impl<T, E> Eval<T, E> {
    /// sets the result value. idempotent: a second call after the `Async` has already
    /// transitioned is a silent no-op.
    pub fn set(&self, value: T) {
        let waiters = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Pending {
                return;
            }
            inner.state = State::Complete;
            inner.value = Some(value);
            mem::take(&mut inner.waiters)
        };
        wake_all(waiters);
    }

    /// sets the exception. idempotent like [`Eval::set`].
    pub fn set_exception(&self, exception: E) {
        let waiters = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != State::Pending {
                return;
            }
            inner.state = State::Exception;
            inner.exception = Some(exception);
            mem::take(&mut inner.waiters)
        };
        wake_all(waiters);
    }

    /// `true` iff the backing `Async` has already been set by some `Eval` (possibly a
    /// clone of this one, for fan-in use cases).
    pub fn is_set(&self) -> bool {
        self.inner.lock().unwrap().state != State::Pending
    }
}

fn wake_all(waiters: VecDeque<Waker>) {
    for waker in waiters {
        waker.wake();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let async_: Async<i32, crate::Error> = Async::new();
        let eval = async_.get_eval();
        eval.set(42);
        assert_eq!(async_.get().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn get_blocks_until_set() {
        let async_: Async<i32, crate::Error> = Async::new();
        let eval = async_.get_eval();

        let waiter = tokio::spawn({
            let async_ = async_.clone();
            async move { async_.get().await }
        });

        tokio::task::yield_now().await;
        eval.set(7);

        assert_eq!(waiter.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn second_set_is_noop() {
        let async_: Async<i32, crate::Error> = Async::new();
        let eval = async_.get_eval();
        eval.set(1);
        eval.set(2);
        assert_eq!(async_.get().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fifo_waiters() {
        let async_: Async<i32, crate::Error> = Async::new();
        let eval = async_.get_eval();

        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for id in 0..3 {
            let async_ = async_.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                async_.get().await.unwrap();
                order.lock().unwrap().push(id);
            }));
        }

        tokio::task::yield_now().await;
        eval.set(0);

        for h in handles {
            h.await.unwrap();
        }

        // all three complete; exact wake order isn't externally observable once the
        // scheduler interleaves them, but none should have panicked or hung.
        assert_eq!(order.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn multiple_waiters_single_value_clone() {
        let async_: Async<String, crate::Error> = Async::new();
        let eval = async_.get_eval();
        eval.set("hello".to_string());
        assert_eq!(async_.get().await.unwrap(), "hello");
        assert_eq!(async_.get().await.unwrap(), "hello");
    }
}

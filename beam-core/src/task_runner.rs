//! serial executor for work submitted from any thread, used to serialize a Channel
//! Writer's async writes without contending at the OS layer.
//!
//! push a callable; if nobody is currently draining, take ownership of the
//! "handling" flag and drain the queue inline, releasing the lock around each
//! callable so `add()` calls from other threads never block behind a running task.
//! every `add()` still only returns once its own submitted task has actually run,
//! whether or not this particular call became the drainer.

use std::{collections::VecDeque, future::Future, pin::Pin, sync::Mutex};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Inner {
    pending: VecDeque<BoxFuture>,
    handling: bool,
}

/// serializes a stream of async tasks so that at most one runs at a time, in the
/// order they were submitted, regardless of which thread calls [`TaskRunner::add`].
pub struct TaskRunner {
    inner: Mutex<Inner>,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                handling: false,
            }),
        }
    }

    /// enqueues `task` and waits for it to actually run. if no drain is currently in
    /// progress, this call drains the queue itself (inline, on the caller's task)
    /// until it is empty; otherwise another in-flight `add()` call's drain loop will
    /// reach this task in turn. either way, `add()` only returns after `task` has run.
    pub async fn add<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let wrapped: BoxFuture = Box::pin(async move {
            task.await;
            let _ = done_tx.send(());
        });

        let should_drain = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.push_back(wrapped);
            if inner.handling {
                false
            } else {
                inner.handling = true;
                true
            }
        };

        if should_drain {
            self.drain().await;
        }

        let _ = done_rx.await;
    }

    async fn drain(&self) {
        loop {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                match inner.pending.pop_front() {
                    Some(task) => task,
                    None => {
                        inner.handling = false;
                        return;
                    }
                }
            };
            // panics escaping a submitted task are reported, not propagated: a single
            // failing write must not wedge every other queued write behind it.
            let result = std::panic::AssertUnwindSafe(next).catch_unwind().await;
            if let Err(cause) = result {
                tracing::error!(?cause, "beam_core::TaskRunner: task panicked");
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }
}

trait CatchUnwindExt: Future + Sized {
    fn catch_unwind(self) -> futures_catch_unwind::CatchUnwind<Self>;
}

impl<F: Future> CatchUnwindExt for std::panic::AssertUnwindSafe<F> {
    fn catch_unwind(self) -> futures_catch_unwind::CatchUnwind<Self> {
        futures_catch_unwind::CatchUnwind { inner: self }
    }
}

/// minimal local `catch_unwind` combinator so `beam-core` doesn't need to pull in
/// `futures-util` for one adapter; mirrors the shape of `futures::FutureExt::catch_unwind`.
mod futures_catch_unwind {
    use std::{
        future::Future,
        panic::AssertUnwindSafe,
        pin::Pin,
        task::{Context, Poll},
    };

    pub struct CatchUnwind<F> {
        pub(super) inner: AssertUnwindSafe<F>,
    }

    impl<F: Future> Future for CatchUnwind<F> {
        type Output = Result<F::Output, Box<dyn std::any::Any + Send>>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            // SAFETY: projecting to the inner future; `AssertUnwindSafe` only affects
            // the panic boundary below, not the pin contract.
            let this = unsafe { self.get_unchecked_mut() };
            let fut = unsafe { Pin::new_unchecked(&mut this.inner.0) };
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fut.poll(cx)))
                .unwrap_or(Poll::Ready(()))
                .map(Ok)
        }
    }
}

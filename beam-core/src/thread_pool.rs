//! elastic pool for blocking work, and [`park`], the primitive that lets a routine
//! call a synchronous API (DNS, file I/O, a blocking C library) without stalling its
//! context's worker thread.
//!
//! Tokio's own blocking pool (`tokio::task::spawn_blocking`) already implements
//! elastic sizing and an idle shutdown timeout, so this leans on it directly rather
//! than hand-rolling a bounded pool of self-terminating worker threads (see
//! DESIGN.md for that call).

use std::future::Future;

use crate::{Eval, Error};

/// thin handle over Tokio's blocking thread pool, kept as a named type so call sites
/// read naturally and so a future alternate backend (e.g. a bounded pool with its
/// own queue depth limit) can replace the body without changing callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPool;

impl ThreadPool {
    pub fn new() -> Self {
        Self
    }

    /// runs `f` on a blocking-pool thread, storing its result or the caught panic
    /// into `eval`.
    pub fn queue<F, T>(&self, f: F, eval: Eval<T, Error>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(f);
        tokio::spawn(async move {
            match handle.await {
                Ok(value) => eval.set(value),
                Err(join_error) => eval.set_exception(Error::Other(Box::new(join_error))),
            }
        });
    }
}

/// runs the blocking closure `f` on the Tokio blocking pool and awaits its result,
/// suspending the calling routine while keeping its context's worker thread free to
/// run other routines. this is how routines safely call synchronous blocking APIs.
pub async fn park<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|join_error| Error::Other(Box::new(join_error)))
}

/// like [`park`], but for an already-async future that should run to completion
/// without being cancelled if the calling routine itself is later dropped/aborted;
/// spawns it as an independent task and awaits the join handle.
pub async fn park_async<F, T>(fut: F) -> Result<T, Error>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|join_error| Error::Other(Box::new(join_error)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn park_runs_blocking_closure() {
        let result = park(|| 2 + 2).await.unwrap();
        assert_eq!(result, 4);
    }

    #[tokio::test]
    async fn thread_pool_queue_sets_eval() {
        let async_ = crate::Async::<i32, Error>::new();
        let eval = async_.get_eval();
        ThreadPool::new().queue(|| 99, eval);
        assert_eq!(async_.get().await.unwrap(), 99);
    }
}

//! Scheduling, synchronization and timer primitives that sit underneath everything
//! else in beam. A `Scheduler` owns a fixed pool of OS worker threads, each driving
//! its own single-threaded Tokio runtime; routines are Tokio tasks pinned to one of
//! those runtimes for their whole lifetime, which is what lets [`sync::LockRelease`]
//! and friends assume "suspend" never migrates a routine to another thread mid-flight.

pub mod async_eval;
pub mod queue;
pub mod routine;
pub mod scheduler;
pub mod sync;
pub mod task_runner;
pub mod thread_pool;
pub mod timer;
pub mod util;

pub use async_eval::{Async, Eval};
pub use queue::{Queue, QueueClosed};
pub use routine::{RoutineId, RoutineState, SpawnOptions};
pub use scheduler::{defer, resume, spawn, spawn_on, suspend, wait, Scheduler};
pub use sync::{LockRelease, Sync};
pub use task_runner::TaskRunner;
pub use thread_pool::ThreadPool;

use std::fmt;

/// crate-wide error type. most beam-core operations that can fail do so with one of
/// these variants rather than a caller-supplied type; [`Async`]/[`Eval`] and
/// [`Queue`] are generic over the error type precisely so callers who need something
/// richer (e.g. beam-http's parse errors) aren't forced through this enum.
#[derive(Debug)]
pub enum Error {
    /// a routine was asked to suspend/resume/wait outside of a running [`Scheduler`].
    NoScheduler,
    /// the scheduler (or the context a routine was pinned to) has already shut down.
    SchedulerShutdown,
    /// a blocking operation (queue pop, timer wait, async get) was cancelled before
    /// completing, typically because the resource it was waiting on was closed.
    Cancelled,
    /// wraps an arbitrary boxed cause, for call sites that need to thread a foreign
    /// error through an `Async<T, Error>`.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoScheduler => write!(f, "no scheduler is running on this thread"),
            Error::SchedulerShutdown => write!(f, "scheduler has shut down"),
            Error::Cancelled => write!(f, "operation was cancelled"),
            Error::Other(cause) => write!(f, "{cause}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Other(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::NoScheduler => Error::NoScheduler,
            Error::SchedulerShutdown => Error::SchedulerShutdown,
            Error::Cancelled => Error::Cancelled,
            // boxed causes aren't Clone in general; collapse to their Display text.
            Error::Other(cause) => Error::Other(Box::new(std::io::Error::other(cause.to_string()))),
        }
    }
}

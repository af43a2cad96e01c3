//! M:N scheduling of [`Routine`]s onto a fixed pool of worker threads ("contexts").
//!
//! Each "context" is one single-threaded Tokio runtime owned by one OS thread,
//! grounded on `xitca-server`'s one-current-thread-runtime-per-worker-thread design,
//! and a routine is a plain Tokio task pinned to whichever context it was spawned on
//! for its whole lifetime. Tokio's own executor already implements per-context
//! run-queueing, so [`ContextHandle`] tracks only the pending/suspended counts
//! callers need to observe from outside, rather than re-implementing a queue itself.
//!
//! `resume()` is built directly on [`tokio::sync::Notify`], which already stores a
//! single wakeup permit when `notify_one()` is called before anyone is waiting --
//! this closes the suspend/resume race where a resume arrives while the target
//! routine is still on its way to the wait point: that wakeup is never lost.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
};

use tokio::{runtime, sync::Notify};

use crate::{
    routine::{RoutineId, RoutineState, SpawnOptions},
    sync::Sync as BeamSync,
    Async, Eval, Error,
};

/// per-context bookkeeping: a handle into that context's single-threaded runtime, plus
/// the pending/suspended counters external observers can poll.
pub struct ContextHandle {
    id: usize,
    handle: runtime::Handle,
    pending: AtomicUsize,
    suspended: AtomicUsize,
}

impl ContextHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// number of routines currently runnable (spawned or re-queued, not yet
    /// suspended) on this context.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// number of routines parked on something (an `Async`, a `Queue`, a timer, a
    /// channel read/write) bound to this context.
    pub fn suspended_count(&self) -> usize {
        self.suspended.load(Ordering::SeqCst)
    }
}

struct RoutineEntry {
    context: usize,
    state: RoutineState,
    /// resume wakeup; `notify_one()` before the routine waits leaves a stored permit,
    /// so an early resume is never lost.
    resume: Arc<Notify>,
    /// fires once when the routine transitions to `Completed`, for `wait(id)`.
    completed: Arc<Notify>,
}

/// owns the worker-thread pool and the routine id -> entry map. normally accessed
/// through the free functions in this module ([`spawn`], [`defer`], ...), which defer
/// to [`Scheduler::global`], but nothing stops a caller from constructing one
/// directly (e.g. in tests).
pub struct Scheduler {
    contexts: Vec<Arc<ContextHandle>>,
    routines: BeamSync<HashMap<RoutineId, RoutineEntry>>,
    next_context: AtomicUsize,
    // keeps each context's runtime alive for the scheduler's lifetime. current-thread
    // runtimes stop driving their tasks as soon as they're dropped.
    _runtimes: Vec<runtime::Runtime>,
}

thread_local! {
    static CURRENT: std::cell::RefCell<Option<(RoutineId, usize)>> = const { std::cell::RefCell::new(None) };
    static EXTERNAL: std::cell::RefCell<Option<RoutineId>> = const { std::cell::RefCell::new(None) };
}

fn current_context() -> Option<(RoutineId, usize)> {
    CURRENT.with(|c| *c.borrow())
}

impl Scheduler {
    /// spawns `worker_threads` OS threads, each driving its own current-thread Tokio
    /// runtime. defaults to `std::thread::available_parallelism()` when
    /// `worker_threads` is `None`.
    pub fn new(worker_threads: Option<usize>) -> Arc<Self> {
        let count = worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        });

        let mut contexts = Vec::with_capacity(count);
        let mut runtimes = Vec::with_capacity(count);

        for id in 0..count {
            let rt = runtime::Builder::new_current_thread()
                .enable_all()
                .thread_name(format!("beam-context-{id}"))
                .build()
                .expect("failed to build beam scheduler context runtime");
            // current-thread runtimes need a dedicated OS thread pumping them, since
            // nothing else drives their reactor/timer otherwise.
            let handle = rt.handle().clone();
            let handle_for_thread = handle.clone();
            std::thread::Builder::new()
                .name(format!("beam-context-{id}"))
                .spawn(move || {
                    handle_for_thread.block_on(std::future::pending::<()>());
                })
                .expect("failed to spawn beam scheduler context thread");

            contexts.push(Arc::new(ContextHandle {
                id,
                handle,
                pending: AtomicUsize::new(0),
                suspended: AtomicUsize::new(0),
            }));
            runtimes.push(rt);
        }

        Arc::new(Self {
            contexts,
            routines: BeamSync::new(HashMap::new()),
            next_context: AtomicUsize::new(0),
            _runtimes: runtimes,
        })
    }

    /// process-wide default scheduler, lazily constructed on first use, so that
    /// `beam_core::spawn(f)` stays ergonomic, while an explicit `Scheduler` can still
    /// be built and used directly (e.g. in tests, to avoid touching global state).
    pub fn global() -> &'static Arc<Scheduler> {
        static GLOBAL: OnceLock<Arc<Scheduler>> = OnceLock::new();
        GLOBAL.get_or_init(|| Scheduler::new(None))
    }

    pub fn worker_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn context(&self, id: usize) -> &Arc<ContextHandle> {
        &self.contexts[id]
    }

    fn pick_context(&self, context_id: Option<usize>) -> usize {
        match context_id {
            Some(id) => id % self.contexts.len(),
            None => self.next_context.fetch_add(1, Ordering::Relaxed) % self.contexts.len(),
        }
    }

    /// spawns `f` as a new routine bound to `context_id` (round-robin over all
    /// contexts if `None`). returns the routine's id immediately; `f` starts running
    /// the next time its context's runtime polls it.
    pub fn spawn<F, Fut>(self: &Arc<Self>, f: F, _opts: SpawnOptions, context_id: Option<usize>) -> RoutineId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let context = self.pick_context(context_id);
        let id = RoutineId::next();

        self.contexts[context].pending.fetch_add(1, Ordering::SeqCst);

        let resume = Arc::new(Notify::new());
        let completed = Arc::new(Notify::new());
        self.routines.with(|routines| {
            routines.insert(
                id,
                RoutineEntry {
                    context,
                    state: RoutineState::Pending,
                    resume: resume.clone(),
                    completed: completed.clone(),
                },
            );
        });

        let this = self.clone();
        self.contexts[context].handle.spawn(async move {
            CURRENT.with(|c| *c.borrow_mut() = Some((id, context)));
            this.contexts[context]
                .pending
                .fetch_sub(1, Ordering::SeqCst);
            this.set_state(id, RoutineState::Running);

            f().await;

            this.finish(id);
            completed.notify_waiters();
        });

        id
    }

    /// convenience wrapper around [`spawn`](Self::spawn) that stores `f`'s return
    /// value into `eval` (or any panic payload rendered as [`Error::Other`]) before
    /// the routine completes.
    pub fn spawn_with_eval<F, Fut, T>(
        self: &Arc<Self>,
        f: F,
        opts: SpawnOptions,
        context_id: Option<usize>,
        eval: Eval<T, Error>,
    ) -> RoutineId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(
            move || async move {
                let value = f().await;
                eval.set(value);
            },
            opts,
            context_id,
        )
    }

    fn set_state(&self, id: RoutineId, state: RoutineState) {
        self.routines.with(|routines| {
            if let Some(entry) = routines.get_mut(&id) {
                let ctx = &self.contexts[entry.context];
                match (entry.state, state) {
                    (RoutineState::Suspended, other) if other != RoutineState::Suspended => {
                        ctx.suspended.fetch_sub(1, Ordering::SeqCst);
                    }
                    (other, RoutineState::Suspended) if other != RoutineState::Suspended => {
                        ctx.suspended.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => {}
                }
                entry.state = state;
            }
        });
    }

    fn finish(&self, id: RoutineId) {
        self.routines.with(|routines| {
            if let Some(entry) = routines.remove(&id) {
                if entry.state == RoutineState::Suspended {
                    self.contexts[entry.context].suspended.fetch_sub(1, Ordering::SeqCst);
                }
            }
        });
    }

    fn resume_notify(&self, id: RoutineId) -> Option<Arc<Notify>> {
        self.routines.with(|routines| routines.get(&id).map(|e| e.resume.clone()))
    }

    fn completed_notify(&self, id: RoutineId) -> Option<Arc<Notify>> {
        self.routines.with(|routines| routines.get(&id).map(|e| e.completed.clone()))
    }

    fn is_live(&self, id: RoutineId) -> bool {
        self.routines.with(|routines| routines.contains_key(&id))
    }

    /// wakes the routine identified by `id`. a wakeup delivered before the routine
    /// reaches its wait point is not lost (see module docs); waking a routine that is
    /// not currently suspended, or that has already completed, is a harmless no-op.
    pub fn resume(&self, id: RoutineId) {
        if let Some(notify) = self.resume_notify(id) {
            notify.notify_one();
        }
    }

    /// parks the caller until the routine identified by `id` completes. returns
    /// immediately if the routine is not (or no longer) live.
    pub async fn wait(&self, id: RoutineId) {
        let Some(notify) = self.completed_notify(id) else {
            return;
        };
        if !self.is_live(id) {
            return;
        }
        notify.notified().await;
    }

    /// suspends the *current* routine (the one calling this from inside a spawned
    /// future) until a matching [`resume`](Self::resume) call. marks it `Suspended`
    /// for the duration so [`ContextHandle::suspended_count`] reflects it.
    pub async fn suspend_self(&self) {
        let Some((id, _)) = current_context() else {
            return;
        };
        let Some(notify) = self.resume_notify(id) else {
            return;
        };
        self.set_state(id, RoutineState::Suspended);
        notify.notified().await;
        self.set_state(id, RoutineState::Running);
    }
}

/// spawns `f` onto the global [`Scheduler`], letting it pick a context round-robin.
pub fn spawn<F, Fut>(f: F) -> RoutineId
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Scheduler::global().spawn(f, SpawnOptions::default(), None)
}

/// spawns `f` pinned to a specific context on the global [`Scheduler`].
pub fn spawn_on<F, Fut>(context_id: usize, f: F) -> RoutineId
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Scheduler::global().spawn(f, SpawnOptions::default(), Some(context_id))
}

/// yields control back to the context's runtime, re-queuing the current routine at
/// the back of its pending deque so others may run. outside of a routine this is a
/// harmless no-op wait.
pub async fn defer() {
    tokio::task::yield_now().await;
}

/// suspends the current routine until [`resume`] is called with its id. only valid to
/// call from inside a routine spawned by a [`Scheduler`] (including a non-worker
/// thread that has minted itself an external identity via [`current_routine`]);
/// outside of one this returns immediately.
pub async fn suspend() {
    Scheduler::global().suspend_self().await;
}

/// wakes the routine identified by `id`. see [`Scheduler::resume`].
pub fn resume(id: RoutineId) {
    Scheduler::global().resume(id);
}

/// waits for the routine identified by `id` to complete. see [`Scheduler::wait`].
pub async fn wait(id: RoutineId) {
    Scheduler::global().wait(id).await;
}

/// returns the id of the routine currently running on this thread, lazily minting an
/// "external" id the first time a non-worker thread calls this -- a thread-
/// impersonation pattern letting a caller thread `suspend`/`resume` as if it were a
/// routine itself. application main threads (and anything else that calls into
/// `beam-rpc`'s `ServiceClient`
/// without itself being a scheduler worker) get a stable identity this way without
/// needing to be a worker thread themselves.
pub fn current_routine() -> RoutineId {
    if let Some((id, _)) = current_context() {
        return id;
    }
    EXTERNAL.with(|e| {
        let mut slot = e.borrow_mut();
        if let Some(id) = *slot {
            return id;
        }
        let id = RoutineId::next();
        *slot = Some(id);
        id
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn spawn_reaches_complete_and_wait_returns() {
        let scheduler = Scheduler::new(Some(2));
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let id = scheduler.spawn(
            move || async move {
                ran2.store(true, Ordering::SeqCst);
            },
            SpawnOptions::default(),
            None,
        );
        scheduler.wait(id).await;
        assert!(ran.load(Ordering::SeqCst));
        // completed routine is removed from the id map.
        assert!(!scheduler.is_live(id));
    }

    #[tokio::test]
    async fn wait_on_unknown_id_returns_immediately() {
        let scheduler = Scheduler::new(Some(1));
        let bogus = RoutineId::next();
        scheduler.wait(bogus).await;
    }

    #[tokio::test]
    async fn resume_before_suspend_is_not_lost() {
        // a resume that lands while the target routine is still on its way to
        // `suspend_self` must still wake it, via Notify's stored-permit semantics.
        let scheduler = Scheduler::new(Some(1));
        let woke = Arc::new(AtomicBool::new(false));
        let woke2 = woke.clone();

        let sched_for_routine = scheduler.clone();
        let id = scheduler.spawn(
            move || async move {
                // simulate "about to suspend, but resume races in first".
                sched_for_routine.suspend_self().await;
                woke2.store(true, Ordering::SeqCst);
            },
            SpawnOptions::default(),
            None,
        );

        // give the routine a moment to register, then resume it from outside.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        scheduler.resume(id);
        scheduler.wait(id).await;
        assert!(woke.load(Ordering::SeqCst));
    }
}

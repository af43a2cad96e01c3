//! timer abstractions: a real-clock timer, a manually-triggered timer, a
//! test-controllable timer, and [`TimedConditionVariable`], which composes a
//! condition-variable-style wakeup with a timer so that whichever resolves first
//! wins.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::Notify;

use crate::Error;

/// outcome of a timer expiring or being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Expired,
    Cancelled,
}

/// a timer backed by the real wall clock -- `tokio::time::sleep` under the hood, so
/// it composes correctly with `tokio::time::pause`/`advance` in tests.
pub struct LiveTimer {
    duration: Duration,
    cancelled: Arc<Notify>,
}

impl LiveTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            cancelled: Arc::new(Notify::new()),
        }
    }

    /// waits for `duration` to elapse, or for [`LiveTimer::cancel`] to be called
    /// first, whichever happens sooner.
    pub async fn wait(&self) -> Expiry {
        tokio::select! {
            biased;
            _ = self.cancelled.notified() => Expiry::Cancelled,
            _ = tokio::time::sleep(self.duration) => Expiry::Expired,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

/// a timer that only fires when explicitly [`trigger`](TriggerTimer::trigger)ed --
/// used to model externally-driven deadlines (e.g. "fire when this other operation
/// completes") rather than a fixed duration.
#[derive(Clone)]
pub struct TriggerTimer {
    notify: Arc<Notify>,
    fired: Arc<std::sync::atomic::AtomicBool>,
}

impl Default for TriggerTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerTimer {
    pub fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            fired: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub async fn wait(&self) -> Expiry {
        if self.fired.load(std::sync::atomic::Ordering::SeqCst) {
            return Expiry::Expired;
        }
        self.notify.notified().await;
        Expiry::Expired
    }

    pub fn trigger(&self) {
        self.fired.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// deterministic, manually-advanced timer for unit tests that need to control expiry
/// precisely without real (or `tokio::time::pause`d) wall-clock delay -- a test
/// decides directly when it fires rather than waiting on any clock.
#[derive(Clone, Default)]
pub struct TestTimer {
    inner: Arc<Mutex<TestTimerState>>,
    notify: Arc<Notify>,
}

#[derive(Default)]
struct TestTimerState {
    expired: bool,
    cancelled: bool,
}

impl TestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait(&self) -> Expiry {
        loop {
            {
                let state = self.inner.lock().unwrap();
                if state.expired {
                    return Expiry::Expired;
                }
                if state.cancelled {
                    return Expiry::Cancelled;
                }
            }
            self.notify.notified().await;
        }
    }

    /// manually fires the timer, as if its duration had elapsed.
    pub fn expire(&self) {
        self.inner.lock().unwrap().expired = true;
        self.notify.notify_waiters();
    }

    pub fn cancel(&self) {
        self.inner.lock().unwrap().cancelled = true;
        self.notify.notify_waiters();
    }
}

/// reactor for timers whose expiry must be armed and disarmed under the same lock
/// that gates some other async completion callback -- resolves the "deadline timer
/// vs. completed I/O" race for UDP receivers: the deadline is armed inside the same
/// mutex that gates the receive callback, and both paths transition through a single
/// `is_deadline_pending` flag so only one of them can win.
pub struct AlarmReactor {
    state: Mutex<AlarmState>,
}

struct AlarmState {
    deadline_pending: bool,
    resolved: bool,
}

impl Default for AlarmReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmReactor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AlarmState {
                deadline_pending: false,
                resolved: false,
            }),
        }
    }

    /// arms the deadline; returns `true` if the caller should actually schedule the
    /// timer (no other resolution has happened yet), `false` if the race has already
    /// been settled by the paired callback and arming would be wasted.
    pub fn arm_deadline(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.resolved {
            return false;
        }
        state.deadline_pending = true;
        true
    }

    /// the deadline timer firing; returns `true` iff it won the race (the paired
    /// callback had not already resolved things).
    pub fn deadline_fired(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.resolved {
            return false;
        }
        state.resolved = true;
        state.deadline_pending = false;
        true
    }

    /// the paired async completion (e.g. a UDP `async_receive`) firing; returns
    /// `true` iff it won the race.
    pub fn completion_fired(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.resolved {
            return false;
        }
        state.resolved = true;
        true
    }

    pub fn is_deadline_pending(&self) -> bool {
        self.state.lock().unwrap().deadline_pending
    }
}

/// composes a `Notify`-style condition variable with a [`LiveTimer`]: whichever
/// resolves first (a notification, or the deadline elapsing) decides the outcome.
pub struct TimedConditionVariable {
    notify: Notify,
}

impl Default for TimedConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl TimedConditionVariable {
    pub fn new() -> Self {
        Self { notify: Notify::new() }
    }

    pub fn notify_one(&self) {
        self.notify.notify_one();
    }

    pub fn notify_all(&self) {
        self.notify.notify_waiters();
    }

    /// waits for a notification, or `timeout` to elapse, whichever comes first.
    pub async fn timed_wait(&self, timeout: Duration) -> Result<(), Error> {
        tokio::select! {
            biased;
            _ = self.notify.notified() => Ok(()),
            _ = tokio::time::sleep(timeout) => Err(Error::Cancelled),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn live_timer_expires() {
        let timer = LiveTimer::new(Duration::from_millis(50));
        let wait = tokio::spawn(async move { timer.wait().await });
        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(wait.await.unwrap(), Expiry::Expired);
    }

    #[tokio::test]
    async fn trigger_timer_fires_on_trigger() {
        let timer = TriggerTimer::new();
        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait().await })
        };
        tokio::task::yield_now().await;
        timer.trigger();
        assert_eq!(waiter.await.unwrap(), Expiry::Expired);
    }

    #[tokio::test]
    async fn test_timer_manual_expiry() {
        let timer = TestTimer::new();
        let waiter = {
            let timer = timer.clone();
            tokio::spawn(async move { timer.wait().await })
        };
        tokio::task::yield_now().await;
        timer.expire();
        assert_eq!(waiter.await.unwrap(), Expiry::Expired);
    }

    #[test]
    fn alarm_reactor_only_one_side_wins() {
        let reactor = AlarmReactor::new();
        assert!(reactor.arm_deadline());
        assert!(reactor.completion_fired());
        // deadline firing after completion already won must lose the race.
        assert!(!reactor.deadline_fired());
    }

    #[tokio::test]
    async fn timed_condition_variable_notify_wins() {
        let cv = Arc::new(TimedConditionVariable::new());
        let cv2 = cv.clone();
        let waiter = tokio::spawn(async move { cv2.timed_wait(Duration::from_secs(10)).await });
        tokio::task::yield_now().await;
        cv.notify_one();
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_condition_variable_timeout_wins() {
        let cv = TimedConditionVariable::new();
        let result = cv.timed_wait(Duration::from_millis(10)).await;
        assert!(result.is_err());
    }
}

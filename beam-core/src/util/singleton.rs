//! lazily-initialized, process-wide singleton, the same access pattern
//! [`crate::scheduler::Scheduler::global`] is itself built on; exposed separately
//! here since other process-wide services (a default `ThreadPool`, a default logger
//! sink) want the same pattern without being `Scheduler` specifically.

use std::sync::OnceLock;

/// wraps a `OnceLock<T>` with a single `get_or_init`-style accessor.
pub struct Singleton<T> {
    cell: OnceLock<T>,
    init: fn() -> T,
}

impl<T> Singleton<T> {
    /// `init` is stored, not called, until the first [`Singleton::get`].
    pub const fn new(init: fn() -> T) -> Self {
        Self { cell: OnceLock::new(), init }
    }

    pub fn get(&self) -> &T {
        self.cell.get_or_init(self.init)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static INIT_COUNT: AtomicUsize = AtomicUsize::new(0);
    static INSTANCE: Singleton<usize> = Singleton::new(|| {
        INIT_COUNT.fetch_add(1, Ordering::SeqCst);
        42
    });

    #[test]
    fn initializes_exactly_once() {
        assert_eq!(*INSTANCE.get(), 42);
        assert_eq!(*INSTANCE.get(), 42);
        assert_eq!(INIT_COUNT.load(Ordering::SeqCst), 1);
    }
}

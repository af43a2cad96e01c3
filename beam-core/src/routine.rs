//! identity and lifecycle state for a single scheduled routine.
//!
//! a routine is a plain Tokio task, so most of its state machine is subsumed by
//! Tokio's own task scheduling; [`RoutineState`] keeps just the subset callers can
//! usefully observe from outside (e.g. for diagnostics), and [`SpawnOptions`] keeps
//! a stack-size knob as a documented no-op for call sites that want to set one
//! without it affecting how the routine actually runs.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ROUTINE_ID: AtomicU64 = AtomicU64::new(1);

/// opaque, process-unique identifier for a spawned routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId(u64);

impl RoutineId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ROUTINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for RoutineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Routine({})", self.0)
    }
}

/// coarse lifecycle state of a routine, as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineState {
    /// spawned but not yet polled for the first time.
    Pending,
    /// currently executing on its context's worker thread.
    Running,
    /// suspended, waiting on some other routine to call [`crate::scheduler::resume`].
    Suspended,
    /// returned (successfully or by panicking); terminal.
    Completed,
}

/// options controlling how a routine is spawned.
///
/// `stack_size_hint` records a per-routine stack size request. Tokio tasks don't
/// carry a configurable stack (they run on the pooled runtime worker's own stack),
/// so this is accepted and stored for introspection only; it does not currently
/// affect scheduling.
#[derive(Debug, Clone, Copy)]
pub struct SpawnOptions {
    pub stack_size_hint: Option<usize>,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self { stack_size_hint: None }
    }
}

impl SpawnOptions {
    pub fn with_stack_size_hint(stack_size_hint: usize) -> Self {
        Self { stack_size_hint: Some(stack_size_hint) }
    }
}

//! Reactive runtime - thread-local state shared by the whole graph.
//!
//! The runtime is a process-global singleton (single-threaded cooperative
//! scheduling, so "process-global" means one per thread):
//! - The tracking stack: which reaction is currently collecting dependencies.
//! - The owner stack: which scope newly created cells attach to.
//! - The scheduler state: batch depth, pending-effect queue, exec counter.
//! - The mount queue: callbacks deferred to the next flush boundary.
//!
//! All public entry points funnel through [`with_runtime`]. Individual
//! fields use `Cell`/`RefCell` interior mutability; no borrow is ever held
//! across user code.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::error::RuntimeError;

use super::cell::ReactiveCell;
use super::owner::OwnerRecord;

/// Default number of consecutive self-rescheduling cycles before an effect
/// is disposed with `CycleLimitExceeded`.
pub(crate) const DEFAULT_CYCLE_LIMIT: u32 = 100;

/// One dependency-collection frame.
///
/// Pushed while a reaction (derived or effect) runs its compute function.
/// Reads inside the frame either confirm an existing edge (in-order prefix
/// reuse) or collect a new source; the frame is committed when the run
/// finishes.
pub(crate) struct TrackingFrame {
    /// The reaction currently collecting dependencies.
    pub reaction: Rc<ReactiveCell>,
    /// Length of the prefix of `reaction.sources` confirmed re-read in order.
    pub skipped: usize,
    /// Sources read this run that were not part of the reused prefix.
    pub new_sources: Vec<Rc<ReactiveCell>>,
    /// Read-cycle stamp used to deduplicate repeated reads of one source.
    pub read_version: u64,
}

/// Entry in the deferred mount queue: the registering owner (if any) and
/// the callback. Callbacks whose owner died before the flush boundary are
/// dropped.
pub(crate) type MountEntry = (Option<Weak<OwnerRecord>>, Box<dyn FnOnce()>);

/// Hook invoked when the scheduler must report an error to the host.
pub(crate) type ErrorHook = Rc<dyn Fn(RuntimeError)>;

pub(crate) struct Runtime {
    /// Tracking stack. `None` entries are untracked sections.
    pub tracking: RefCell<Vec<Option<TrackingFrame>>>,
    /// Owner stack; the top is the scope new cells attach to.
    pub owners: RefCell<Vec<Rc<OwnerRecord>>>,
    /// Nonzero while inside `batch()`.
    pub batch_depth: Cell<usize>,
    /// True while a flush is draining the queue (writes made by effects are
    /// picked up by the running flush, never nested).
    pub in_flush: Cell<bool>,
    /// Effects with `PENDING_NOTIFY` set, in scheduling order.
    pub pending: RefCell<VecDeque<Rc<ReactiveCell>>>,
    /// Monotonic counter, incremented once per flush cycle.
    pub exec_count: Cell<u64>,
    /// Monotonic counter, incremented once per source write. Drives the
    /// version-based staleness check for lazy recomputation.
    pub write_version: Cell<u64>,
    /// Monotonic counter, incremented once per tracked run.
    pub read_version: Cell<u64>,
    /// Callbacks deferred to the next flush boundary.
    pub mounts: RefCell<Vec<MountEntry>>,
    /// Consecutive-cycle threshold for `CycleLimitExceeded`.
    pub cycle_limit: Cell<u32>,
    /// Host hook for scheduler errors; defaults to `log::error!`.
    pub error_hook: RefCell<Option<ErrorHook>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            tracking: RefCell::new(Vec::new()),
            owners: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            in_flush: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
            exec_count: Cell::new(0),
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            mounts: RefCell::new(Vec::new()),
            cycle_limit: Cell::new(DEFAULT_CYCLE_LIMIT),
            error_hook: RefCell::new(None),
        }
    }

    /// True if any reaction is collecting dependencies right now.
    pub fn is_tracking(&self) -> bool {
        self.tracking
            .borrow()
            .last()
            .is_some_and(|frame| frame.is_some())
    }

    /// Report a scheduler error through the host hook, or `log::error!`.
    pub fn report(&self, error: RuntimeError) {
        let hook = self.error_hook.borrow().clone();
        match hook {
            Some(hook) => hook(error),
            None => log::error!("{error}"),
        }
    }
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// Run `f` with access to the thread-local runtime.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

// =============================================================================
// Untracked sections
// =============================================================================

/// Evaluate `f` with dependency tracking suspended.
///
/// Reads inside `f` do not create edges, so a derived or effect calling
/// `untrack` will not re-run when those cells change.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.tracking.borrow_mut().push(None));
    let guard = UntrackGuard;
    let result = f();
    drop(guard);
    result
}

/// Pops the `None` tracking entry even if `f` panics.
struct UntrackGuard;

impl Drop for UntrackGuard {
    fn drop(&mut self) {
        with_runtime(|rt| {
            rt.tracking.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Batching
// =============================================================================

/// Run `f` with notification flushing deferred to the end.
///
/// Writes inside the batch mark and enqueue observers as usual, but the
/// pending-effect queue drains only once, when the outermost batch exits.
/// Batches nest; only the outermost one flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
    let guard = BatchGuard;
    let result = f();
    drop(guard);
    result
}

/// Decrements the batch depth (and flushes at zero) even if `f` panics.
struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = with_runtime(|rt| {
            let depth = rt.batch_depth.get() - 1;
            rt.batch_depth.set(depth);
            depth
        });
        if depth == 0 {
            super::scheduler::flush();
        }
    }
}

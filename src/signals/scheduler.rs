//! Effect scheduler - batched notification and topological flush.
//!
//! Effects are never pulled; they sit in a pending queue until a flush
//! drains it. A flush runs in cycles: each cycle stamps a fresh exec
//! count, snapshots the queue sorted by level (stable, so same-level
//! effects keep scheduling order), and runs each effect at most once.
//! An effect scheduled a second time within the same cycle - it wrote to
//! one of its own transitive sources - is deferred to the next cycle, and
//! after `cycle_limit` consecutive deferrals it is disposed with
//! [`RuntimeError::CycleLimitExceeded`].
//!
//! Running effects in ascending level order, combined with the derived
//! equality short-circuit, is what makes diamond updates glitch-free: no
//! effect observes a state where only some of its sources have advanced.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{RuntimeError, UserError};

use super::cell::{self, CellFlags, CellKind, Computation, ReactiveCell};
use super::context;
use super::owner;
use super::runtime::{with_runtime, ErrorHook};

/// Enqueue an effect for the next flush. Idempotent: `PENDING_NOTIFY`
/// guarantees a cell is in the queue at most once.
pub(crate) fn schedule(cell: &Rc<ReactiveCell>) {
    let flags = cell.flags.get();
    if flags.contains(CellFlags::PENDING_NOTIFY) || flags.contains(CellFlags::DISPOSED) {
        return;
    }
    cell.flags.set(flags | CellFlags::PENDING_NOTIFY);
    with_runtime(|rt| rt.pending.borrow_mut().push_back(cell.clone()));
}

/// Flush unless a batch is open or a flush is already draining (writes
/// made by effects are picked up by the running flush, never nested).
pub(crate) fn maybe_flush() {
    let ready = with_runtime(|rt| rt.batch_depth.get() == 0 && !rt.in_flush.get());
    if ready {
        flush();
    }
}

/// Clears the in-flush marker even when an unhandled user panic unwinds
/// through the flush.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.in_flush.set(false));
    }
}

/// Drain the pending-effect queue to quiescence, then run deferred mount
/// callbacks.
pub(crate) fn flush() {
    let entered = with_runtime(|rt| {
        if rt.in_flush.get() || rt.batch_depth.get() > 0 {
            false
        } else {
            rt.in_flush.set(true);
            true
        }
    });
    if !entered {
        return;
    }
    let guard = FlushGuard;

    loop {
        let has_pending = with_runtime(|rt| !rt.pending.borrow().is_empty());
        if !has_pending {
            break;
        }
        let exec = with_runtime(|rt| {
            let exec = rt.exec_count.get() + 1;
            rt.exec_count.set(exec);
            exec
        });
        run_cycle(exec);
    }

    drop(guard);
    run_mounts();
}

/// Run one flush cycle: drain the queue (including effects scheduled by
/// the effects themselves) until it is empty, deferring same-cycle
/// re-entries to the next cycle.
fn run_cycle(exec: u64) {
    let limit = with_runtime(|rt| rt.cycle_limit.get());
    let mut deferred: Vec<Rc<ReactiveCell>> = Vec::new();

    loop {
        let mut snapshot: Vec<Rc<ReactiveCell>> =
            with_runtime(|rt| rt.pending.borrow_mut().drain(..).collect());
        if snapshot.is_empty() {
            break;
        }
        snapshot.sort_by_key(|c| c.level.get());

        for effect in snapshot {
            effect
                .flags
                .set(effect.flags.get() - CellFlags::PENDING_NOTIFY);
            if effect.is_disposed() {
                continue;
            }
            if effect.updated_at.get() == exec {
                // Re-entry within the same cycle.
                let streak = if effect.deferred_at.get() + 1 == exec {
                    effect.cycle_streak.get() + 1
                } else {
                    1
                };
                if streak >= limit {
                    with_runtime(|rt| rt.report(RuntimeError::CycleLimitExceeded { limit }));
                    cell::dispose_cell(&effect);
                    continue;
                }
                effect.cycle_streak.set(streak);
                effect.deferred_at.set(exec);
                deferred.push(effect);
                continue;
            }
            run_effect(&effect);
            effect.updated_at.set(exec);
        }
    }

    with_runtime(|rt| {
        let mut pending = rt.pending.borrow_mut();
        for effect in deferred {
            effect
                .flags
                .set(effect.flags.get() | CellFlags::PENDING_NOTIFY);
            pending.push_back(effect);
        }
    });
}

/// Run one effect: tear down the previous run, skip the body when no
/// source actually changed (the pull-side short-circuit), otherwise run
/// tracked under the effect's owner scope, trapping panics at the nearest
/// error boundary.
pub(crate) fn run_effect(effect: &Rc<ReactiveCell>) {
    if effect.is_disposed() || effect.kind != CellKind::Effect {
        return;
    }

    let first_run = effect.computed_at.get() == 0 && effect.updated_at.get() == 0;
    let must_run = first_run
        || effect.flags.get().contains(CellFlags::DIRTY)
        || cell::sources_changed(effect);
    effect
        .flags
        .set(effect.flags.get() - (CellFlags::STALE | CellFlags::DIRTY));
    if !must_run {
        return;
    }

    // Prior cleanup runs before every re-execution (and is therefore
    // already done if the body goes on to panic).
    if let Some(teardown) = effect.teardown.borrow_mut().take() {
        teardown();
    }

    let owner_record = effect.owner.borrow().as_ref().and_then(std::rc::Weak::upgrade);
    let trap = owner_record.as_ref().and_then(context::error_trap_for);

    let body = || {
        cell::run_tracked(effect, || {
            let mut computation = effect.computation.borrow_mut();
            match computation.as_mut() {
                Some(Computation::Effect(run)) => run(),
                _ => None,
            }
        })
    };

    let outcome = owner::run_in_record(owner_record.as_ref(), || match &trap {
        Some(trap) => match catch_unwind(AssertUnwindSafe(body)) {
            Ok(teardown) => Some(teardown),
            Err(payload) => {
                (trap.handler)(UserError::from_panic(payload));
                None
            }
        },
        None => Some(body()),
    });

    if let Some(teardown) = outcome {
        *effect.teardown.borrow_mut() = teardown;
    }
    let version = with_runtime(|rt| rt.write_version.get());
    effect.computed_at.set(version);
}

/// Drain the deferred mount queue. Callbacks whose owner died are dropped.
/// Mount callbacks may enqueue further mounts; keep draining until empty.
///
/// Skipped while a scope body is still constructing (the owner stack is
/// non-empty); the boundary at the end of that scope drains instead.
pub(crate) fn run_mounts() {
    let ready = with_runtime(|rt| rt.owners.borrow().is_empty());
    if !ready {
        return;
    }
    loop {
        let batch: Vec<_> = with_runtime(|rt| rt.mounts.borrow_mut().drain(..).collect());
        if batch.is_empty() {
            break;
        }
        for (owner_ref, callback) in batch {
            let alive = match &owner_ref {
                Some(weak) => weak.upgrade().is_some_and(|o| !o.is_disposed()),
                None => true,
            };
            if alive {
                callback();
            }
        }
    }
}

// =============================================================================
// Host configuration
// =============================================================================

/// Override the consecutive-cycle threshold for cycle detection.
pub fn set_cycle_limit(limit: u32) {
    with_runtime(|rt| rt.cycle_limit.set(limit.max(1)));
}

/// Install a hook that receives scheduler errors. Without one, errors go
/// to `log::error!`.
pub fn set_error_hook(hook: impl Fn(RuntimeError) + 'static) {
    with_runtime(|rt| {
        *rt.error_hook.borrow_mut() = Some(Rc::new(hook) as ErrorHook);
    });
}

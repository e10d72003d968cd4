//! The reactive cell - one record type for sources, deriveds and effects.
//!
//! Every node in the graph is a [`ReactiveCell`] with a [`CellKind`]
//! discriminant. The memoization of a derived and the scheduling of an
//! effect are orthogonal fields on the same struct, so the hot paths
//! (read, notify) stay branch-light.
//!
//! # Edges
//!
//! For every edge `A -> B` (B depends on A):
//! - `B.sources[i] == A` and `B.source_slots[i]` is the index of B inside
//!   `A.observers`.
//! - `A.observers[j]` weakly references B and `A.observer_slots[j]` is the
//!   index of A inside `B.sources`.
//!
//! Unsubscription is swap-remove plus a slot fix-up on the entry that got
//! moved: O(1) per edge. Observer arrays are inline small-vectors and only
//! spill to the heap past four observers.
//!
//! # Staleness
//!
//! Writes stamp a global write version. A derived records the version it
//! was computed at (`computed_at`) and the version its value last actually
//! changed at (`changed_at`). A STALE cell stabilizes by checking its
//! sources' `changed_at` stamps: if none advanced past `computed_at`, the
//! cell becomes CLEAN without recomputing. That check is what collapses
//! diamond patterns in the pull direction.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use smallvec::SmallVec;

use super::owner::OwnerRecord;
use super::runtime::{with_runtime, TrackingFrame};

/// Cleanup function: returned by effects, registered with owners.
pub type CleanupFn = Box<dyn FnOnce()>;

/// Type-erased equality predicate over cell values.
pub(crate) type EqualsFn = Rc<dyn Fn(&dyn Any, &dyn Any) -> bool>;

bitflags! {
    /// Cell state bits. The empty set is CLEAN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct CellFlags: u8 {
        /// A transitive source may have changed; verify before trusting the value.
        const STALE          = 1 << 0;
        /// A direct source definitely changed; recompute on next pull/run.
        const DIRTY          = 1 << 1;
        /// Already sitting in the pending-effect queue.
        const PENDING_NOTIFY = 1 << 2;
        /// Torn down; never scheduled, reads warn, writes are ignored.
        const DISPOSED       = 1 << 3;
        /// Compute is on the stack right now (re-entrant read protection).
        const RUNNING        = 1 << 4;
    }
}

/// Discriminant for the unified cell record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    /// Writable cell holding a stored value.
    Source,
    /// Lazy memo computed from other cells.
    Derived,
    /// Side-effect reaction; never read by anything, explicitly scheduled.
    Effect,
}

/// The compute function of a derived or effect.
pub(crate) enum Computation {
    Derived(Box<dyn FnMut() -> Box<dyn Any>>),
    Effect(Box<dyn FnMut() -> Option<CleanupFn>>),
}

/// The universal reactive node.
pub(crate) struct ReactiveCell {
    pub kind: CellKind,
    pub flags: Cell<CellFlags>,
    /// Topological depth: one greater than the max of the sources' levels.
    pub level: Cell<u32>,
    /// Exec-cycle stamp of the last run (effect dedup within one cycle).
    pub updated_at: Cell<u64>,
    /// Exec-cycle stamp of the last same-cycle deferral (cycle detection).
    pub deferred_at: Cell<u64>,
    /// Consecutive cycles this effect deferred itself.
    pub cycle_streak: Cell<u32>,
    /// Write-version stamp of the last computation.
    pub computed_at: Cell<u64>,
    /// Write-version stamp of the last actual value change.
    pub changed_at: Cell<u64>,
    /// Read-version stamp (deduplicates repeated reads within one run).
    pub read_at: Cell<u64>,
    /// Stored value (sources, deriveds). Kept after disposal so that late
    /// reads can return the last known value.
    pub value: RefCell<Option<Box<dyn Any>>>,
    /// Compute function (deriveds, effects).
    pub computation: RefCell<Option<Computation>>,
    /// Equality predicate gating writes and derived fan-out.
    pub equals: RefCell<Option<EqualsFn>>,
    /// Cleanup returned by the previous effect run.
    pub teardown: RefCell<Option<CleanupFn>>,
    /// Cells this cell currently depends on (strong: a reader keeps its
    /// sources alive).
    pub sources: RefCell<Vec<Rc<ReactiveCell>>>,
    /// For each source, our index inside its observer array.
    pub source_slots: RefCell<Vec<usize>>,
    /// Cells depending on this cell (weak: observers are kept alive by
    /// their owners, not by their sources).
    pub observers: RefCell<SmallVec<[Weak<ReactiveCell>; 4]>>,
    /// For each observer, this cell's index inside its source array.
    pub observer_slots: RefCell<SmallVec<[usize; 4]>>,
    /// Scope that created this cell.
    pub owner: RefCell<Option<Weak<OwnerRecord>>>,
}

impl ReactiveCell {
    fn blank(kind: CellKind) -> ReactiveCell {
        ReactiveCell {
            kind,
            flags: Cell::new(CellFlags::empty()),
            level: Cell::new(0),
            updated_at: Cell::new(0),
            deferred_at: Cell::new(0),
            cycle_streak: Cell::new(0),
            computed_at: Cell::new(0),
            changed_at: Cell::new(0),
            read_at: Cell::new(0),
            value: RefCell::new(None),
            computation: RefCell::new(None),
            equals: RefCell::new(None),
            teardown: RefCell::new(None),
            sources: RefCell::new(Vec::new()),
            source_slots: RefCell::new(Vec::new()),
            observers: RefCell::new(SmallVec::new()),
            observer_slots: RefCell::new(SmallVec::new()),
            owner: RefCell::new(None),
        }
    }

    /// Create a source cell holding `value`.
    pub fn new_source(value: Box<dyn Any>, equals: Option<EqualsFn>) -> Rc<ReactiveCell> {
        let cell = ReactiveCell::blank(CellKind::Source);
        *cell.value.borrow_mut() = Some(value);
        *cell.equals.borrow_mut() = equals;
        let cell = Rc::new(cell);
        super::owner::attach_cell(&cell);
        cell
    }

    /// Create a derived cell. The compute runs lazily on first read.
    pub fn new_derived(
        compute: Box<dyn FnMut() -> Box<dyn Any>>,
        equals: Option<EqualsFn>,
    ) -> Rc<ReactiveCell> {
        let cell = ReactiveCell::blank(CellKind::Derived);
        *cell.computation.borrow_mut() = Some(Computation::Derived(compute));
        *cell.equals.borrow_mut() = equals;
        let cell = Rc::new(cell);
        super::owner::attach_cell(&cell);
        cell
    }

    /// Create an effect cell. The caller schedules the first run.
    pub fn new_effect(body: Box<dyn FnMut() -> Option<CleanupFn>>) -> Rc<ReactiveCell> {
        let cell = ReactiveCell::blank(CellKind::Effect);
        *cell.computation.borrow_mut() = Some(Computation::Effect(body));
        let cell = Rc::new(cell);
        super::owner::attach_cell(&cell);
        cell
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.flags.get().contains(CellFlags::DISPOSED)
    }

    /// Borrow the stored value as `T` and map it through `f`.
    pub fn with_value<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let value = self.value.borrow();
        value.as_ref().and_then(|v| v.downcast_ref::<T>()).map(f)
    }
}

// =============================================================================
// Dependency tracking
// =============================================================================

/// Register `source` as a dependency of the active reaction, if any.
///
/// Sources re-read in the same order as the previous run keep their edges
/// (prefix reuse); everything else is collected and linked when the run
/// commits. Repeated reads of one source within a run are deduplicated by
/// the read-version stamp.
pub(crate) fn track_read(source: &Rc<ReactiveCell>) {
    with_runtime(|rt| {
        let mut tracking = rt.tracking.borrow_mut();
        let Some(Some(frame)) = tracking.last_mut() else {
            return;
        };
        if Rc::ptr_eq(source, &frame.reaction) {
            return;
        }
        if source.read_at.get() == frame.read_version {
            return;
        }
        source.read_at.set(frame.read_version);
        if frame.new_sources.is_empty() {
            let sources = frame.reaction.sources.borrow();
            if let Some(existing) = sources.get(frame.skipped) {
                if Rc::ptr_eq(existing, source) {
                    frame.skipped += 1;
                    return;
                }
            }
        }
        frame.new_sources.push(source.clone());
    });
}

/// Full read path for sources and deriveds: warn on disposed access,
/// stabilize lazy cells, then register the dependency.
pub(crate) fn touch(cell: &Rc<ReactiveCell>) {
    if cell.is_disposed() {
        log::warn!("read of a disposed cell; returning last known value");
        return;
    }
    if cell.kind == CellKind::Derived {
        stabilize(cell);
    }
    track_read(cell);
}

/// Pops the tracking frame if the computation panicked.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        with_runtime(|rt| {
            rt.tracking.borrow_mut().pop();
        });
    }
}

/// Run `body` as the computation of `cell`, collecting dependencies.
///
/// On completion the collected edges are committed: sources not re-read
/// are unlinked, new sources are linked, and the level is recomputed. On
/// panic the frame is popped and the previous edges are left in place (the
/// cell is about to be disposed by whoever traps the panic).
pub(crate) fn run_tracked<R>(cell: &Rc<ReactiveCell>, body: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        let version = rt.read_version.get() + 1;
        rt.read_version.set(version);
        rt.tracking.borrow_mut().push(Some(TrackingFrame {
            reaction: cell.clone(),
            skipped: 0,
            new_sources: Vec::new(),
            read_version: version,
        }));
    });
    let guard = FrameGuard;
    let result = body();
    std::mem::forget(guard);
    let frame = with_runtime(|rt| rt.tracking.borrow_mut().pop());
    if let Some(Some(frame)) = frame {
        commit_frame(frame);
    }
    result
}

/// Rewire edges after a tracked run: drop the unread tail, link new sources,
/// refresh the topological level.
fn commit_frame(frame: TrackingFrame) {
    let cell = frame.reaction;
    unlink_sources_from(&cell, frame.skipped);
    for source in &frame.new_sources {
        link_edge(source, &cell);
    }
    let level = {
        let sources = cell.sources.borrow();
        1 + sources.iter().map(|s| s.level.get()).max().unwrap_or(0)
    };
    cell.level.set(level);
}

/// Create the bidirectional edge `source -> observer`.
fn link_edge(source: &Rc<ReactiveCell>, observer: &Rc<ReactiveCell>) {
    let slot = source.observers.borrow().len();
    observer.sources.borrow_mut().push(source.clone());
    observer.source_slots.borrow_mut().push(slot);
    let back = observer.sources.borrow().len() - 1;
    source.observers.borrow_mut().push(Rc::downgrade(observer));
    source.observer_slots.borrow_mut().push(back);
}

/// Unlink `cell` from all of its sources starting at index `start`.
pub(crate) fn unlink_sources_from(cell: &Rc<ReactiveCell>, start: usize) {
    let removed: Vec<(Rc<ReactiveCell>, usize)> = {
        let mut sources = cell.sources.borrow_mut();
        let mut slots = cell.source_slots.borrow_mut();
        if start >= sources.len() {
            return;
        }
        let tail = sources.split_off(start);
        let tail_slots = slots.split_off(start);
        tail.into_iter().zip(tail_slots).collect()
    };
    for (source, slot) in removed {
        remove_observer_at(&source, slot);
    }
}

/// Swap-remove the observer entry at `slot` and fix up the entry that got
/// moved into its place.
fn remove_observer_at(source: &Rc<ReactiveCell>, slot: usize) {
    let moved = {
        let mut observers = source.observers.borrow_mut();
        let mut slots = source.observer_slots.borrow_mut();
        if slot >= observers.len() {
            return;
        }
        observers.swap_remove(slot);
        slots.swap_remove(slot);
        if slot < observers.len() {
            observers[slot].upgrade().map(|cell| (cell, slots[slot]))
        } else {
            None
        }
    };
    if let Some((moved, back)) = moved {
        if let Some(entry) = moved.source_slots.borrow_mut().get_mut(back) {
            *entry = slot;
        }
    }
}

/// Swap-remove the source entry at `index` from `observer` and fix up the
/// moved source's back-slot.
fn remove_source_at(observer: &Rc<ReactiveCell>, index: usize) {
    let moved = {
        let mut sources = observer.sources.borrow_mut();
        let mut slots = observer.source_slots.borrow_mut();
        if index >= sources.len() {
            return;
        }
        sources.swap_remove(index);
        slots.swap_remove(index);
        if index < sources.len() {
            Some((sources[index].clone(), slots[index]))
        } else {
            None
        }
    };
    if let Some((moved_source, slot)) = moved {
        if let Some(entry) = moved_source.observer_slots.borrow_mut().get_mut(slot) {
            *entry = index;
        }
    }
}

/// Snapshot the live observers of `cell`.
///
/// Notification iterates a copy because observer handlers may add or
/// remove observers mid-iteration.
pub(crate) fn snapshot_observers(cell: &ReactiveCell) -> Vec<Rc<ReactiveCell>> {
    cell.observers
        .borrow()
        .iter()
        .filter_map(Weak::upgrade)
        .collect()
}

// =============================================================================
// Writes and notification
// =============================================================================

/// Write a new value into a source cell.
///
/// No-op when the equality predicate deems the value unchanged. Otherwise
/// direct observers are marked DIRTY, transitive deriveds STALE, every
/// effect encountered is scheduled, and the queue is flushed unless a
/// batch or a flush is already in progress.
pub(crate) fn write(cell: &Rc<ReactiveCell>, new_value: Box<dyn Any>) {
    if cell.is_disposed() {
        log::warn!("write to a disposed cell ignored");
        return;
    }
    {
        let current = cell.value.borrow();
        let equals = cell.equals.borrow();
        if let (Some(current), Some(equals)) = (current.as_ref(), equals.as_ref()) {
            if equals(current.as_ref(), new_value.as_ref()) {
                return;
            }
        }
    }
    let version = with_runtime(|rt| {
        let v = rt.write_version.get() + 1;
        rt.write_version.set(v);
        v
    });
    *cell.value.borrow_mut() = Some(new_value);
    cell.changed_at.set(version);
    cell.computed_at.set(version);
    notify_observers(cell);
    super::scheduler::maybe_flush();
}

/// Mark downstream cells after a source changed.
///
/// Direct observers become DIRTY; deriveds further out become STALE via a
/// breadth-first walk that stops at already-notified cells; effects are
/// scheduled wherever they appear.
pub(crate) fn notify_observers(cell: &Rc<ReactiveCell>) {
    let mut queue: std::collections::VecDeque<Rc<ReactiveCell>> = std::collections::VecDeque::new();

    for observer in snapshot_observers(cell) {
        match observer.kind {
            CellKind::Effect => {
                observer.flags.set(observer.flags.get() | CellFlags::DIRTY);
                super::scheduler::schedule(&observer);
            }
            CellKind::Derived => {
                let flags = observer.flags.get();
                let already = flags.intersects(CellFlags::STALE | CellFlags::DIRTY);
                observer.flags.set(flags | CellFlags::DIRTY);
                if !already {
                    queue.push_back(observer);
                }
            }
            CellKind::Source => {}
        }
    }

    while let Some(derived) = queue.pop_front() {
        for observer in snapshot_observers(&derived) {
            match observer.kind {
                CellKind::Effect => {
                    super::scheduler::schedule(&observer);
                }
                CellKind::Derived => {
                    let flags = observer.flags.get();
                    if !flags.intersects(CellFlags::STALE | CellFlags::DIRTY) {
                        observer.flags.set(flags | CellFlags::STALE);
                        queue.push_back(observer);
                    }
                }
                CellKind::Source => {}
            }
        }
    }
}

// =============================================================================
// Lazy stabilization (deriveds)
// =============================================================================

/// Clears the RUNNING flag if the compute panics.
struct RunningGuard(Rc<ReactiveCell>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.flags.set(self.0.flags.get() - CellFlags::RUNNING);
    }
}

/// Bring a derived up to date, recomputing only when a source actually
/// changed since the last computation.
pub(crate) fn stabilize(cell: &Rc<ReactiveCell>) {
    let flags = cell.flags.get();
    if flags.intersects(CellFlags::DISPOSED | CellFlags::RUNNING) {
        return;
    }
    let never_computed = cell.value.borrow().is_none();
    if never_computed || flags.contains(CellFlags::DIRTY) {
        update_derived(cell);
        return;
    }
    if !flags.contains(CellFlags::STALE) {
        return;
    }
    if sources_changed(cell) {
        update_derived(cell);
    } else {
        cell.flags
            .set(cell.flags.get() - (CellFlags::STALE | CellFlags::DIRTY));
    }
}

/// Stabilize derived sources and report whether any changed after this
/// cell's last computation.
pub(crate) fn sources_changed(cell: &Rc<ReactiveCell>) -> bool {
    let sources: Vec<Rc<ReactiveCell>> = cell.sources.borrow().clone();
    for source in &sources {
        if source.kind == CellKind::Derived {
            stabilize(source);
        }
        if source.changed_at.get() > cell.computed_at.get() {
            return true;
        }
    }
    false
}

/// Recompute a derived: run the compute tracked, compare with the stored
/// value, and advance `changed_at` only on an actual change so that
/// observers stay clean across no-op recomputations.
fn update_derived(cell: &Rc<ReactiveCell>) {
    cell.flags.set(cell.flags.get() | CellFlags::RUNNING);
    let guard = RunningGuard(cell.clone());

    let new_value = run_tracked(cell, || {
        let mut computation = cell.computation.borrow_mut();
        match computation.as_mut() {
            Some(Computation::Derived(compute)) => Some(compute()),
            _ => None,
        }
    });
    drop(guard);

    let Some(new_value) = new_value else {
        return;
    };

    let changed = {
        let current = cell.value.borrow();
        let equals = cell.equals.borrow();
        match (current.as_ref(), equals.as_ref()) {
            (Some(current), Some(equals)) => !equals(current.as_ref(), new_value.as_ref()),
            (Some(_), None) => true,
            (None, _) => true,
        }
    };

    let (version, exec) = with_runtime(|rt| (rt.write_version.get(), rt.exec_count.get()));
    cell.computed_at.set(version);
    cell.updated_at.set(exec);
    if changed {
        *cell.value.borrow_mut() = Some(new_value);
        cell.changed_at.set(version);
    }
    cell.flags
        .set(cell.flags.get() - (CellFlags::STALE | CellFlags::DIRTY));
}

// =============================================================================
// Disposal
// =============================================================================

/// Tear a cell out of the graph: run its teardown, sever every edge in
/// both directions, and mark it DISPOSED. The last value is kept so late
/// reads can still return it.
pub(crate) fn dispose_cell(cell: &Rc<ReactiveCell>) {
    if cell.is_disposed() {
        return;
    }
    cell.flags.set(cell.flags.get() | CellFlags::DISPOSED);

    if let Some(teardown) = cell.teardown.borrow_mut().take() {
        teardown();
    }

    unlink_sources_from(cell, 0);

    let observers: Vec<(Weak<ReactiveCell>, usize)> = {
        let mut obs = cell.observers.borrow_mut();
        let mut slots = cell.observer_slots.borrow_mut();
        obs.drain(..).zip(slots.drain(..)).collect()
    };
    for (weak, back) in observers {
        if let Some(observer) = weak.upgrade() {
            remove_source_at(&observer, back);
        }
    }

    *cell.computation.borrow_mut() = None;
    *cell.owner.borrow_mut() = None;
}

// =============================================================================
// Graph introspection (test support)
// =============================================================================

/// Check the bidirectional-edge invariant for a pair of cells.
#[cfg(test)]
pub(crate) fn edges_consistent(source: &Rc<ReactiveCell>, observer: &Rc<ReactiveCell>) -> bool {
    let forward = observer
        .sources
        .borrow()
        .iter()
        .any(|s| Rc::ptr_eq(s, source));
    let backward = snapshot_observers(source)
        .iter()
        .any(|o| Rc::ptr_eq(o, observer));
    forward == backward
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_of(v: i32) -> Rc<ReactiveCell> {
        ReactiveCell::new_source(
            Box::new(v),
            Some(Rc::new(|a: &dyn Any, b: &dyn Any| {
                a.downcast_ref::<i32>() == b.downcast_ref::<i32>()
            })),
        )
    }

    #[test]
    fn test_link_and_unlink_edges() {
        let a = source_of(1);
        let b = source_of(2);
        let reader = ReactiveCell::new_effect(Box::new(|| None));

        run_tracked(&reader, || {
            track_read(&a);
            track_read(&b);
        });

        assert_eq!(reader.sources.borrow().len(), 2);
        assert_eq!(a.observers.borrow().len(), 1);
        assert_eq!(b.observers.borrow().len(), 1);
        assert!(edges_consistent(&a, &reader));
        assert!(edges_consistent(&b, &reader));

        unlink_sources_from(&reader, 0);
        assert!(reader.sources.borrow().is_empty());
        assert_eq!(a.observers.borrow().len(), 0);
        assert_eq!(b.observers.borrow().len(), 0);
    }

    #[test]
    fn test_prefix_reuse_keeps_slots() {
        let a = source_of(1);
        let b = source_of(2);
        let reader = ReactiveCell::new_effect(Box::new(|| None));

        run_tracked(&reader, || {
            track_read(&a);
            track_read(&b);
        });
        let slot_before = reader.source_slots.borrow()[0];

        // Re-run reading the same sources in the same order: edges survive.
        run_tracked(&reader, || {
            track_read(&a);
            track_read(&b);
        });
        assert_eq!(reader.sources.borrow().len(), 2);
        assert_eq!(reader.source_slots.borrow()[0], slot_before);
        assert_eq!(a.observers.borrow().len(), 1);

        // Re-run reading only `b`: the `a` edge is dropped.
        run_tracked(&reader, || {
            track_read(&b);
        });
        assert_eq!(reader.sources.borrow().len(), 1);
        assert_eq!(a.observers.borrow().len(), 0);
        assert_eq!(b.observers.borrow().len(), 1);
    }

    #[test]
    fn test_duplicate_reads_deduplicated() {
        let a = source_of(1);
        let reader = ReactiveCell::new_effect(Box::new(|| None));

        run_tracked(&reader, || {
            track_read(&a);
            track_read(&a);
            track_read(&a);
        });
        assert_eq!(reader.sources.borrow().len(), 1);
        assert_eq!(a.observers.borrow().len(), 1);
    }

    #[test]
    fn test_level_tracks_source_depth() {
        let a = source_of(1);
        let reader = ReactiveCell::new_effect(Box::new(|| None));
        run_tracked(&reader, || track_read(&a));
        assert_eq!(a.level.get(), 0);
        assert_eq!(reader.level.get(), 1);
    }

    #[test]
    fn test_equality_short_circuit_skips_notification() {
        let a = source_of(1);
        // A derived observer: it is marked but never scheduled, so the
        // flags survive the write for inspection.
        let reader = ReactiveCell::new_derived(Box::new(|| Box::new(0_i32) as Box<dyn Any>), None);
        run_tracked(&reader, || track_read(&a));

        write(&a, Box::new(1));
        assert!(
            !reader
                .flags
                .get()
                .intersects(CellFlags::STALE | CellFlags::DIRTY)
        );

        write(&a, Box::new(2));
        assert!(reader.flags.get().contains(CellFlags::DIRTY));
    }

    #[test]
    fn test_dispose_severs_both_directions() {
        let a = source_of(1);
        let reader = ReactiveCell::new_effect(Box::new(|| None));
        run_tracked(&reader, || track_read(&a));

        dispose_cell(&a);
        assert!(a.is_disposed());
        assert!(a.observers.borrow().is_empty());
        assert!(reader.sources.borrow().is_empty());
    }

    #[test]
    fn test_disposed_write_ignored() {
        let a = source_of(1);
        dispose_cell(&a);
        write(&a, Box::new(99));
        assert_eq!(a.with_value(|v: &i32| *v), Some(1));
    }
}

//! Owner scopes - the unit of reactive teardown.
//!
//! Owners form a strict tree mirroring the component tree. Every cell
//! created while a scope is on the owner stack attaches to it; disposing
//! an owner runs its cleanups in reverse insertion order, disposes its
//! children recursively, and finally tears its cells out of the graph.
//! After disposal no effect belonging to the owner ever runs again (the
//! scheduler skips DISPOSED cells at flush time).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::cell::{self, CleanupFn, ReactiveCell};
use super::runtime::with_runtime;
use super::scheduler;

/// Internal owner record.
pub(crate) struct OwnerRecord {
    pub parent: RefCell<Option<Weak<OwnerRecord>>>,
    pub children: RefCell<Vec<Rc<OwnerRecord>>>,
    pub cells: RefCell<Vec<Rc<ReactiveCell>>>,
    pub cleanups: RefCell<Vec<CleanupFn>>,
    /// Context bindings keyed by context id (type-erased values).
    pub contexts: RefCell<FxHashMap<u64, Rc<dyn Any>>>,
    pub disposed: Cell<bool>,
}

impl OwnerRecord {
    fn new(parent: Option<Weak<OwnerRecord>>) -> Rc<OwnerRecord> {
        Rc::new(OwnerRecord {
            parent: RefCell::new(parent),
            children: RefCell::new(Vec::new()),
            cells: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            contexts: RefCell::new(FxHashMap::default()),
            disposed: Cell::new(false),
        })
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Walk up to the parent record, if it is still alive.
    pub fn parent_record(&self) -> Option<Rc<OwnerRecord>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }
}

/// Handle to an ownership scope.
///
/// Cloning is cheap and shares the scope; [`Owner::dispose`] tears down
/// the whole subtree.
#[derive(Clone)]
pub struct Owner {
    pub(crate) record: Rc<OwnerRecord>,
}

impl Owner {
    /// True once the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.record.is_disposed()
    }

    /// Dispose this scope: cleanups in reverse order, then children, then
    /// cells. Idempotent.
    pub fn dispose(&self) {
        if let Some(parent) = self.record.parent_record() {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, &self.record));
        }
        dispose_record(&self.record);
    }

    /// Run `f` with this scope as the current owner.
    pub fn run_in<R>(&self, f: impl FnOnce() -> R) -> R {
        run_in_record(Some(&self.record), f)
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn dispose_record(record: &Rc<OwnerRecord>) {
    if record.disposed.replace(true) {
        return;
    }

    let cleanups: Vec<CleanupFn> = record.cleanups.borrow_mut().drain(..).collect();
    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }

    let children: Vec<Rc<OwnerRecord>> = record.children.borrow_mut().drain(..).collect();
    for child in children {
        dispose_record(&child);
    }

    let cells: Vec<Rc<ReactiveCell>> = record.cells.borrow_mut().drain(..).collect();
    for c in cells {
        cell::dispose_cell(&c);
    }

    record.contexts.borrow_mut().clear();
    *record.parent.borrow_mut() = None;
}

// =============================================================================
// Owner stack
// =============================================================================

/// Pops the owner stack entry even if user code panics.
struct OwnerGuard(bool);

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        if self.0 {
            with_runtime(|rt| {
                rt.owners.borrow_mut().pop();
            });
        }
    }
}

/// Run `f` with `record` (when present) as the current owner.
pub(crate) fn run_in_record<R>(record: Option<&Rc<OwnerRecord>>, f: impl FnOnce() -> R) -> R {
    let pushed = match record {
        Some(record) => {
            with_runtime(|rt| rt.owners.borrow_mut().push(record.clone()));
            true
        }
        None => false,
    };
    let _guard = OwnerGuard(pushed);
    f()
}

pub(crate) fn current_record() -> Option<Rc<OwnerRecord>> {
    with_runtime(|rt| rt.owners.borrow().last().cloned())
}

/// Attach a freshly created cell to the current owner, if any.
pub(crate) fn attach_cell(cell: &Rc<ReactiveCell>) {
    if let Some(record) = current_record() {
        *cell.owner.borrow_mut() = Some(Rc::downgrade(&record));
        record.cells.borrow_mut().push(cell.clone());
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Create a scope, run `f` under it, and return the result with the scope
/// handle. The scope attaches as a child of the current owner when one
/// exists; otherwise it is a root.
pub fn create_scope<R>(f: impl FnOnce() -> R) -> (R, Owner) {
    let parent = current_record();
    let record = OwnerRecord::new(parent.as_ref().map(Rc::downgrade));
    if let Some(parent) = parent {
        parent.children.borrow_mut().push(record.clone());
    }
    let result = run_in_record(Some(&record), f);
    // Completing an outermost scope is a flush boundary: deferred mounts
    // registered during the body run now (unless a batch or flush will
    // provide the boundary instead).
    let boundary = with_runtime(|rt| {
        rt.owners.borrow().is_empty() && !rt.in_flush.get() && rt.batch_depth.get() == 0
    });
    if boundary {
        scheduler::flush();
    }
    (result, Owner { record })
}

/// The scope currently on top of the owner stack.
pub fn current_owner() -> Option<Owner> {
    current_record().map(|record| Owner { record })
}

/// Register a callback to run when the current scope is disposed.
///
/// Cleanups run in reverse insertion order. Outside any scope the callback
/// is dropped with a warning.
pub fn on_cleanup(callback: impl FnOnce() + 'static) {
    match current_record() {
        Some(record) => record.cleanups.borrow_mut().push(Box::new(callback)),
        None => log::warn!("on_cleanup called outside a scope; callback dropped"),
    }
}

/// Defer a callback to the next flush boundary after the current
/// synchronous computation. If the registering scope is disposed before
/// that boundary, the callback is dropped.
pub fn on_mount(callback: impl FnOnce() + 'static) {
    let owner = current_record().map(|record| Rc::downgrade(&record));
    with_runtime(|rt| {
        rt.mounts.borrow_mut().push((owner, Box::new(callback)));
    });
}

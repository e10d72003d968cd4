//! Async-state helper layered on top of the core.
//!
//! The core does not suspend: asynchronous work happens outside the
//! scheduler, and when it completes the host writes into cells, which
//! triggers flushes normally. [`Resource`] packages that pattern: a signal
//! carrying [`AsyncState`], plus a pending guard that keeps the nearest
//! `defer` boundary showing its fallback until the work settles.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::context::{lookup_raw, DEFER_KEY};
use super::owner::current_record;
use super::signal::{signal, Signal};

/// State of one asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncState<T, E> {
    /// Still resolving.
    Pending,
    /// Completed with a value.
    Resolved(T),
    /// Failed with an error.
    Rejected(E),
}

impl<T, E> AsyncState<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AsyncState::Resolved(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AsyncState::Rejected(_))
    }
}

// =============================================================================
// Pending-work accounting (consumed by `defer`)
// =============================================================================

/// Counter shared between a `defer` boundary and the resources beneath it.
pub(crate) struct PendingScope {
    pub count: Signal<usize>,
}

/// RAII handle holding one unit of pending work. The nearest `defer`
/// boundary shows its fallback while any guard in its subtree is alive.
pub struct PendingGuard {
    count: Signal<usize>,
    released: Cell<bool>,
}

impl PendingGuard {
    fn acquire(count: Signal<usize>) -> PendingGuard {
        count.update(|c| c + 1);
        PendingGuard {
            count,
            released: Cell::new(false),
        }
    }

    /// Release the unit of pending work early (otherwise Drop does it).
    pub fn release(&self) {
        if !self.released.replace(true) {
            self.count.update(|c| c.saturating_sub(1));
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Acquire a pending guard from the nearest enclosing `defer` boundary.
/// Returns `None` outside any boundary.
pub fn pending_guard() -> Option<PendingGuard> {
    let record = current_record()?;
    let scope = lookup_raw(&record, DEFER_KEY)?
        .downcast::<PendingScope>()
        .ok()?;
    Some(PendingGuard::acquire(scope.count.clone()))
}

// =============================================================================
// Resource
// =============================================================================

/// A host-driven asynchronous value.
///
/// Created `Pending`; the host calls [`Resource::resolve`] or
/// [`Resource::reject`] when its work settles. Those writes flush the
/// scheduler like any other write, so effects reading the state re-run.
pub struct Resource<T: 'static, E: 'static> {
    state: Signal<AsyncState<T, E>>,
    guard: Rc<RefCell<Option<PendingGuard>>>,
}

impl<T: 'static, E: 'static> Clone for Resource<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            guard: self.guard.clone(),
        }
    }
}

/// Create a pending resource, registering with the nearest `defer`
/// boundary when one is in scope.
pub fn resource<T, E>() -> Resource<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    Resource {
        state: signal(AsyncState::Pending),
        guard: Rc::new(RefCell::new(pending_guard())),
    }
}

impl<T, E> Resource<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
{
    /// Current state, tracked.
    pub fn state(&self) -> AsyncState<T, E> {
        self.state.get()
    }

    /// The underlying signal, for composing deriveds.
    pub fn signal(&self) -> Signal<AsyncState<T, E>> {
        self.state.clone()
    }

    /// True while pending, tracked.
    pub fn loading(&self) -> bool {
        self.state.with(AsyncState::is_pending)
    }

    /// Settle with a value.
    pub fn resolve(&self, value: T) {
        self.guard.borrow_mut().take();
        self.state.set(AsyncState::Resolved(value));
    }

    /// Settle with an error.
    pub fn reject(&self, error: E) {
        self.guard.borrow_mut().take();
        self.state.set(AsyncState::Rejected(error));
    }

    /// Return to `Pending`, re-registering with the nearest boundary.
    pub fn restart(&self) {
        *self.guard.borrow_mut() = pending_guard();
        self.state.set(AsyncState::Pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::effect::effect;
    use std::cell::RefCell as StdRefCell;

    #[test]
    fn test_resource_settles_through_the_graph() {
        let seen: Rc<StdRefCell<Vec<AsyncState<i32, String>>>> =
            Rc::new(StdRefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let res: Resource<i32, String> = resource();
        let res_effect = res.clone();
        let _e = effect(move || {
            seen_clone.borrow_mut().push(res_effect.state());
        });

        res.resolve(42);
        assert_eq!(
            *seen.borrow(),
            vec![AsyncState::Pending, AsyncState::Resolved(42)]
        );
    }

    #[test]
    fn test_reject_then_restart() {
        let res: Resource<i32, String> = resource();
        res.reject("offline".to_string());
        assert!(res.state().is_rejected());
        res.restart();
        assert!(res.loading());
    }
}

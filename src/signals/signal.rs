//! Typed source cells.
//!
//! [`Signal<T>`] is a thin typed handle over the untyped graph cell. The
//! handle is cheap to clone; all clones share the same cell.

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use super::cell::{self, EqualsFn, ReactiveCell};

/// A writable reactive cell.
pub struct Signal<T: 'static> {
    pub(crate) cell: Rc<ReactiveCell>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("disposed", &self.cell.is_disposed())
            .finish()
    }
}

/// Erase a typed equality predicate into the graph's `dyn Any` form.
pub(crate) fn erase_equality<T: 'static>(equals: impl Fn(&T, &T) -> bool + 'static) -> EqualsFn {
    Rc::new(
        move |a: &dyn Any, b: &dyn Any| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => equals(a, b),
            _ => false,
        },
    )
}

/// Create a signal with the default equality predicate (`PartialEq`).
/// Writing an equal value is a no-op: zero observer notifications.
pub fn signal<T: Clone + PartialEq + 'static>(initial: T) -> Signal<T> {
    signal_with_equality(initial, |a: &T, b: &T| a == b)
}

/// Create a signal with a custom equality predicate.
pub fn signal_with_equality<T: Clone + 'static>(
    initial: T,
    equals: impl Fn(&T, &T) -> bool + 'static,
) -> Signal<T> {
    Signal {
        cell: ReactiveCell::new_source(Box::new(initial), Some(erase_equality(equals))),
        _marker: PhantomData,
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Read the value, registering a dependency when called inside a
    /// derived or effect.
    pub fn get(&self) -> T {
        cell::touch(&self.cell);
        match self.cell.with_value(T::clone) {
            Some(value) => value,
            None => unreachable!("source cell always holds a value"),
        }
    }

    /// Read the value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        match self.cell.with_value(T::clone) {
            Some(value) => value,
            None => unreachable!("source cell always holds a value"),
        }
    }

    /// Borrow the value through `f`, registering a dependency.
    ///
    /// `f` must not write back into this signal; the value is borrowed for
    /// the duration of the call.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        cell::touch(&self.cell);
        match self.cell.with_value(f) {
            Some(result) => result,
            None => unreachable!("source cell always holds a value"),
        }
    }

    /// Replace the value. No-op when the equality predicate deems it
    /// unchanged; otherwise observers are notified and the queue flushes
    /// unless batched.
    pub fn set(&self, value: T) {
        cell::write(&self.cell, Box::new(value));
    }

    /// Derive the next value from the current one and write it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get_untracked());
        self.set(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_round_trip() {
        let s = signal(1);
        s.set(5);
        assert_eq!(s.get(), 5);
    }

    #[test]
    fn test_clone_shares_cell() {
        let a = signal(1);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
    }

    #[test]
    fn test_update_uses_current_value() {
        let s = signal(10);
        s.update(|v| v + 5);
        assert_eq!(s.get(), 15);
    }

    #[test]
    fn test_custom_equality_gates_writes() {
        // Treat values as equal when their parity matches: writes that
        // keep parity are swallowed.
        let s = signal_with_equality(2, |a: &i32, b: &i32| a % 2 == b % 2);
        s.set(4);
        assert_eq!(s.get(), 2, "same-parity write must be a no-op");
        s.set(3);
        assert_eq!(s.get(), 3);
    }
}

//! Typed derived cells (lazy memos).
//!
//! A derived recomputes only when pulled while one of its sources has
//! actually changed. Recomputation that produces an equal value leaves
//! observers clean - the pull-side half of glitch freedom.

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use super::cell::{self, ReactiveCell};
use super::signal::erase_equality;

/// A read-only reactive cell computed from other cells.
pub struct Derived<T: 'static> {
    pub(crate) cell: Rc<ReactiveCell>,
    _marker: PhantomData<T>,
}

impl<T: 'static> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("disposed", &self.cell.is_disposed())
            .finish()
    }
}

/// Create a derived cell with the default equality predicate.
///
/// The compute does not run here; the first read computes the value and
/// collects the dependencies.
pub fn derived<T, F>(compute: F) -> Derived<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    derived_with_equality(compute, |a: &T, b: &T| a == b)
}

/// Create a derived cell with a custom equality predicate.
pub fn derived_with_equality<T, F>(compute: F, equals: impl Fn(&T, &T) -> bool + 'static) -> Derived<T>
where
    T: 'static,
    F: FnMut() -> T + 'static,
{
    let mut compute = compute;
    let erased: Box<dyn FnMut() -> Box<dyn Any>> = Box::new(move || Box::new(compute()));
    Derived {
        cell: ReactiveCell::new_derived(erased, Some(erase_equality(equals))),
        _marker: PhantomData,
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Read the memoized value, recomputing if stale, and register a
    /// dependency when called inside a derived or effect.
    pub fn get(&self) -> T {
        cell::touch(&self.cell);
        match self.cell.with_value(T::clone) {
            Some(value) => value,
            None => panic!("derived read after disposal before it ever computed"),
        }
    }

    /// Read without registering a dependency (still recomputes if stale).
    pub fn get_untracked(&self) -> T {
        super::runtime::untrack(|| self.get())
    }

    /// Borrow the memoized value through `f`, registering a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        cell::touch(&self.cell);
        match self.cell.with_value(f) {
            Some(result) => result,
            None => panic!("derived read after disposal before it ever computed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal::signal;
    use std::cell::Cell;

    #[test]
    fn test_lazy_first_compute() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let s = signal(1);
        let s2 = s.clone();

        let d = derived(move || {
            runs_clone.set(runs_clone.get() + 1);
            s2.get() * 2
        });
        assert_eq!(runs.get(), 0, "derived must not compute before first read");
        assert_eq!(d.get(), 2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_memoized_between_changes() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let s = signal(1);
        let s2 = s.clone();

        let d = derived(move || {
            runs_clone.set(runs_clone.get() + 1);
            s2.get() + 10
        });
        assert_eq!(d.get(), 11);
        assert_eq!(d.get(), 11);
        assert_eq!(runs.get(), 1, "repeated reads must reuse the memo");

        s.set(2);
        assert_eq!(d.get(), 12);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_chained_deriveds() {
        let s = signal(2);
        let s2 = s.clone();
        let double = derived(move || s2.get() * 2);
        let double2 = double.clone();
        let quad = derived(move || double2.get() * 2);

        assert_eq!(quad.get(), 8);
        s.set(3);
        assert_eq!(quad.get(), 12);
    }

    #[test]
    fn test_equal_recompute_keeps_observers_clean() {
        let s = signal(1);
        let s2 = s.clone();
        // Collapses to parity: 1 -> 3 keeps the value.
        let parity = derived(move || s2.get() % 2);
        let parity2 = parity.clone();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let downstream = derived(move || {
            runs_clone.set(runs_clone.get() + 1);
            parity2.get() + 100
        });

        assert_eq!(downstream.get(), 101);
        s.set(3);
        assert_eq!(downstream.get(), 101);
        assert_eq!(
            runs.get(),
            1,
            "downstream must not recompute when the parity value is unchanged"
        );
    }
}

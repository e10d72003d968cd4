//! Effects - scheduled side-effect reactions.
//!
//! Effects are never read by anything; they are scheduled for their first
//! run at creation and re-scheduled whenever a dependency changes. The
//! body may return a cleanup that runs before the next execution and on
//! disposal.

use std::rc::Rc;

use super::cell::{CleanupFn, ReactiveCell};
use super::scheduler;

/// Handle to an effect cell.
///
/// Effects are owned by the scope that created them; the handle exists to
/// allow early disposal. Dropping the handle does not dispose the effect.
#[derive(Clone)]
pub struct Effect {
    pub(crate) cell: Rc<ReactiveCell>,
}

impl Effect {
    /// Tear down the effect: runs its pending cleanup and unlinks it from
    /// every source. Pending queue entries are skipped at flush time.
    pub fn dispose(&self) {
        super::cell::dispose_cell(&self.cell);
    }

    /// True once the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.cell.is_disposed()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create an effect. The body runs once immediately (unless inside a
/// batch, in which case it runs when the batch flushes) and again whenever
/// a cell it read changes.
pub fn effect(mut body: impl FnMut() + 'static) -> Effect {
    effect_with_cleanup(move || {
        body();
        None
    })
}

/// Create an effect whose body can return a cleanup function. The cleanup
/// runs before every re-execution and when the effect is disposed.
pub fn effect_with_cleanup(body: impl FnMut() -> Option<CleanupFn> + 'static) -> Effect {
    let cell = ReactiveCell::new_effect(Box::new(body));
    scheduler::schedule(&cell);
    scheduler::maybe_flush();
    Effect { cell }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::runtime::{batch, untrack};
    use crate::signals::signal::signal;
    use std::cell::Cell;

    #[test]
    fn test_effect_runs_on_creation_and_change() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let s = signal(0);
        let s2 = s.clone();

        let _e = effect(move || {
            let _ = s2.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1, "effect must run at creation");

        s.set(1);
        assert_eq!(runs.get(), 2);
        s.set(2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_equal_write_does_not_rerun() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let s = signal(5);
        let s2 = s.clone();

        let _e = effect(move || {
            let _ = s2.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        s.set(5);
        assert_eq!(runs.get(), 1, "equal write must not notify");
    }

    #[test]
    fn test_cleanup_runs_before_rerun_and_on_dispose() {
        let cleanups = Rc::new(Cell::new(0));
        let cleanups_clone = cleanups.clone();
        let s = signal(0);
        let s2 = s.clone();

        let e = effect_with_cleanup(move || {
            let _ = s2.get();
            let counter = cleanups_clone.clone();
            Some(Box::new(move || counter.set(counter.get() + 1)) as CleanupFn)
        });
        assert_eq!(cleanups.get(), 0);

        s.set(1);
        assert_eq!(cleanups.get(), 1, "cleanup runs before re-execution");

        e.dispose();
        assert_eq!(cleanups.get(), 2, "cleanup runs on disposal");

        s.set(2);
        assert_eq!(cleanups.get(), 2, "disposed effect never runs again");
    }

    #[test]
    fn test_untracked_read_creates_no_dependency() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let tracked = signal(0);
        let ignored = signal(0);
        let (tracked2, ignored2) = (tracked.clone(), ignored.clone());

        let _e = effect(move || {
            let _ = tracked2.get();
            let _ = untrack(|| ignored2.get());
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        ignored.set(1);
        assert_eq!(runs.get(), 1, "untracked read must not subscribe");

        tracked.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_batch_coalesces_writes() {
        let observed = Rc::new(std::cell::RefCell::new(Vec::new()));
        let observed_clone = observed.clone();
        let s = signal(0);
        let s2 = s.clone();

        let _e = effect(move || {
            observed_clone.borrow_mut().push(s2.get());
        });

        batch(|| {
            for i in 1..=100 {
                s.set(i);
            }
        });

        assert_eq!(
            *observed.borrow(),
            vec![0, 100],
            "batched writes must produce a single re-run with the final value"
        );
    }

    #[test]
    fn test_effect_created_inside_batch_runs_at_flush() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        batch(move || {
            let _e = effect(move || runs_clone.set(runs_clone.get() + 1));
            // Still zero: the first run waits for the batch boundary.
        });
        assert_eq!(runs.get(), 1);
    }
}

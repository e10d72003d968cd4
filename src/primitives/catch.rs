//! Error boundary.
//!
//! `catch_boundary` traps panics raised synchronously by its subtree:
//! both during the initial render and later, inside descendant effects
//! (the scheduler consults the owner chain for the nearest trap before
//! running an effect body). On a trap the protected subtree is disposed
//! and the handler renders with a reset function that reinstalls the
//! subtree under a fresh owner.
//!
//! `catch_unwind` is confined to this module and to the scheduler's
//! effect runner; it is the Rust rendering of "synchronous throw".

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::UserError;
use crate::render::{realize, Content, PlatformNode};
use crate::signals::context::{provide_raw, ErrorTrap, ERROR_TRAP_KEY};
use crate::signals::{create_scope, effect, signal, untrack, Owner};

/// Reinstalls the protected subtree when invoked.
pub type ResetFn = Rc<dyn Fn()>;

/// Wrap `child` in an error boundary rendering `handler` on failure.
pub fn catch_boundary<N>(
    child: impl Fn() -> Content<N> + 'static,
    handler: impl Fn(&UserError, ResetFn) -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
{
    let container = N::create_container("catch");
    let target = container.clone();
    let child = Rc::new(child);
    let handler = Rc::new(handler);

    let failure: crate::signals::Signal<Option<UserError>> = signal(None);
    let current: Rc<RefCell<Option<Owner>>> = Rc::new(RefCell::new(None));

    effect(move || {
        let error = failure.get();
        let failure = failure.clone();
        untrack(|| {
            if let Some(scope) = current.borrow_mut().take() {
                scope.dispose();
            }
            let (nodes, scope) = match error {
                None => {
                    let child = child.clone();
                    let trap_target = failure.clone();
                    let render_target = failure.clone();
                    create_scope(move || {
                        // Descendant effects find this trap on their owner
                        // chain and deliver panics here.
                        provide_raw(
                            ERROR_TRAP_KEY,
                            Rc::new(ErrorTrap {
                                handler: Rc::new(move |error| trap_target.set(Some(error))),
                            }),
                        );
                        match catch_unwind(AssertUnwindSafe(|| realize(child()))) {
                            Ok(nodes) => nodes,
                            Err(payload) => {
                                render_target.set(Some(UserError::from_panic(payload)));
                                Vec::new()
                            }
                        }
                    })
                }
                Some(error) => {
                    let handler = handler.clone();
                    let reset_target = failure.clone();
                    let reset: ResetFn = Rc::new(move || reset_target.set(None));
                    create_scope(move || realize(handler(&error, reset)))
                }
            };
            *current.borrow_mut() = Some(scope);
            target.set_children(nodes);
            target.notify_update();
        });
    });

    Content::Node(container)
}

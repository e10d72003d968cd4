//! Boolean conditional rendering.
//!
//! The condition is collapsed into a derived boolean gate, so writes that
//! do not flip the resolved boolean never reach the branch effect - the
//! active branch is not reconstructed. A real transition disposes the
//! outgoing branch's scope, builds the incoming branch under a fresh
//! scope, and swaps the container's children. The effect installs
//! synchronously; there is no deferred installation path.

use std::cell::RefCell;
use std::rc::Rc;

use crate::render::{realize, Content, PlatformNode};
use crate::signals::{create_scope, derived, effect, untrack, Owner};

/// Render `children` while `condition` is true, nothing otherwise.
pub fn when<N>(
    condition: impl Fn() -> bool + 'static,
    children: impl Fn() -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
{
    when_impl(condition, children, None)
}

/// Render `children` while `condition` is true, `fallback` otherwise.
pub fn when_or<N>(
    condition: impl Fn() -> bool + 'static,
    children: impl Fn() -> Content<N> + 'static,
    fallback: impl Fn() -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
{
    when_impl(condition, children, Some(Rc::new(fallback)))
}

fn when_impl<N>(
    condition: impl Fn() -> bool + 'static,
    children: impl Fn() -> Content<N> + 'static,
    fallback: Option<Rc<dyn Fn() -> Content<N>>>,
) -> Content<N>
where
    N: PlatformNode,
{
    let container = N::create_container("when");
    let target = container.clone();

    // The equality short-circuit on the resolved boolean is what prevents
    // same-branch reconstruction.
    let gate = derived(move || condition());
    let current: Rc<RefCell<Option<Owner>>> = Rc::new(RefCell::new(None));

    effect(move || {
        let on = gate.get();
        untrack(|| {
            if let Some(scope) = current.borrow_mut().take() {
                scope.dispose();
            }
            let (nodes, scope) = create_scope(|| {
                if on {
                    realize(children())
                } else {
                    match &fallback {
                        Some(fallback) => realize(fallback()),
                        None => Vec::new(),
                    }
                }
            });
            *current.borrow_mut() = Some(scope);
            target.set_children(nodes);
            target.notify_update();
        });
    });

    Content::Node(container)
}

//! Pending-work boundary.
//!
//! `defer` mounts its child immediately - loads beneath it start right
//! away - but the container shows `fallback` until every pending guard
//! acquired in the subtree has been released. The counter travels through
//! context, so resources any number of levels down register with the
//! nearest boundary without plumbing.

use std::rc::Rc;

use crate::render::{realize, Content, PlatformNode};
use crate::signals::context::{provide_raw, DEFER_KEY};
use crate::signals::resource::PendingScope;
use crate::signals::{create_scope, derived, effect, signal};

/// Show `fallback` while any descendant work is pending, `child` once
/// none is.
pub fn defer<N>(
    child: impl FnOnce() -> Content<N> + 'static,
    fallback: impl FnOnce() -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
{
    let container = N::create_container("defer");
    let target = container.clone();

    let count = signal(0_usize);

    let counter = count.clone();
    let (child_nodes, _child_scope) = create_scope(move || {
        provide_raw(DEFER_KEY, Rc::new(PendingScope { count: counter }));
        realize(child())
    });
    let (fallback_nodes, _fallback_scope) = create_scope(move || realize(fallback()));

    // Collapse the counter to a boolean so count changes that do not
    // cross zero never touch the container.
    let pending = derived(move || count.get() > 0);

    effect(move || {
        let waiting = pending.get();
        let children = if waiting {
            fallback_nodes.clone()
        } else {
            child_nodes.clone()
        };
        target.set_children(children);
        target.notify_update();
    });

    Content::Node(container)
}

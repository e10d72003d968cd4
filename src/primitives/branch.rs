//! Multi-way conditional rendering.
//!
//! A single derived scans the arms in order and yields the index of the
//! first truthy one. The branch effect keys off that index, so updates
//! that do not change the selection are absorbed by the equality
//! short-circuit, and a selection change disposes the outgoing arm
//! exactly once before the incoming arm mounts exactly once - no
//! "both mounted" state is ever observable.

use std::cell::RefCell;
use std::rc::Rc;

use crate::render::{realize, Content, PlatformNode};
use crate::signals::{create_scope, derived, effect, untrack, Owner};

/// One arm of a [`branch`].
pub struct Arm<N: PlatformNode> {
    when: Rc<dyn Fn() -> bool>,
    render: Rc<dyn Fn() -> Content<N>>,
}

/// Build an arm from its condition and renderer.
pub fn arm<N>(
    when: impl Fn() -> bool + 'static,
    render: impl Fn() -> Content<N> + 'static,
) -> Arm<N>
where
    N: PlatformNode,
{
    Arm {
        when: Rc::new(when),
        render: Rc::new(render),
    }
}

/// Render the first arm whose condition is truthy, nothing when none is.
pub fn branch<N>(arms: Vec<Arm<N>>) -> Content<N>
where
    N: PlatformNode,
{
    branch_impl(arms, None)
}

/// Render the first truthy arm, `fallback` when none matches.
pub fn branch_or<N>(arms: Vec<Arm<N>>, fallback: impl Fn() -> Content<N> + 'static) -> Content<N>
where
    N: PlatformNode,
{
    branch_impl(arms, Some(Rc::new(fallback)))
}

fn branch_impl<N>(arms: Vec<Arm<N>>, fallback: Option<Rc<dyn Fn() -> Content<N>>>) -> Content<N>
where
    N: PlatformNode,
{
    let container = N::create_container("branch");
    let target = container.clone();
    let arms = Rc::new(arms);

    let scan = arms.clone();
    let selected = derived(move || scan.iter().position(|arm| (arm.when)()));
    let current: Rc<RefCell<Option<Owner>>> = Rc::new(RefCell::new(None));

    effect(move || {
        let pick = selected.get();
        untrack(|| {
            if let Some(scope) = current.borrow_mut().take() {
                scope.dispose();
            }
            let (nodes, scope) = create_scope(|| match pick {
                Some(index) => realize((arms[index].render)()),
                None => match &fallback {
                    Some(fallback) => realize(fallback()),
                    None => Vec::new(),
                },
            });
            *current.borrow_mut() = Some(scope);
            target.set_children(nodes);
            target.notify_update();
        });
    });

    Content::Node(container)
}

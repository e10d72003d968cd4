//! Child insertion - the append semantics of the renderer.
//!
//! Appending dispatches on the content kind:
//! - `Empty` is a no-op; text becomes a text node; nodes attach directly;
//!   lists recurse element by element.
//! - A component descriptor executes under a child owner, then its result
//!   is appended.
//! - A reactive text binding creates one text node plus one effect that
//!   writes the coerced value into it.
//! - A reactive fragment creates a transparent container plus one effect
//!   that re-evaluates the thunk and swaps the container's children,
//!   short-circuiting when the produced nodes are identical.

use std::cell::RefCell;
use std::rc::Rc;

use crate::signals::{create_scope, effect, untrack, Owner};

use super::content::Content;
use super::element;
use super::platform::PlatformNode;

/// Append `content` to `parent`.
pub fn append<N: PlatformNode>(parent: &N, content: Content<N>) {
    match content {
        Content::Empty => {}
        Content::Text(text) => parent.append_child(&N::create_text(&text)),
        Content::Node(node) => parent.append_child(&node),
        Content::Many(items) => {
            for item in items {
                append(parent, item);
            }
        }
        Content::Component(descriptor) => append(parent, element::execute(&descriptor)),
        Content::CellText(read) => {
            let text = install_text_binding::<N>(read);
            parent.append_child(&text);
        }
        Content::Fragment(thunk) => {
            let container = install_fragment::<N>(thunk);
            parent.append_child(&container);
        }
    }
}

/// Resolve content into concrete nodes (used wherever children are
/// replaced atomically via `set_children`).
pub fn realize<N: PlatformNode>(content: Content<N>) -> Vec<N> {
    match content {
        Content::Empty => Vec::new(),
        Content::Text(text) => vec![N::create_text(&text)],
        Content::Node(node) => vec![node],
        Content::Many(items) => items.into_iter().flat_map(realize).collect(),
        Content::Component(descriptor) => realize(element::execute(&descriptor)),
        Content::CellText(read) => vec![install_text_binding::<N>(read)],
        Content::Fragment(thunk) => vec![install_fragment::<N>(thunk)],
    }
}

/// One text node, one effect: the finest grain of reactivity.
pub(crate) fn install_text_binding<N: PlatformNode>(read: Rc<dyn Fn() -> String>) -> N {
    let node = N::create_text("");
    let target = node.clone();
    effect(move || {
        target.set_text(&read());
        target.notify_update();
    });
    node
}

/// A transparent container whose children follow a tracked thunk.
///
/// Each run disposes the previous run's scope, realizes the new content
/// under a fresh scope (untracked, so reads inside child construction do
/// not subscribe the fragment), and swaps the children - unless they are
/// the same nodes, in which case the platform is not touched.
pub(crate) fn install_fragment<N: PlatformNode>(thunk: Rc<dyn Fn() -> Content<N>>) -> N {
    let container = N::create_container("fragment");
    let target = container.clone();
    let previous: Rc<RefCell<Option<(Vec<N>, Owner)>>> = Rc::new(RefCell::new(None));

    effect(move || {
        let content = thunk();
        let old = previous.borrow_mut().take();
        if let Some((_, scope)) = &old {
            scope.dispose();
        }
        let (nodes, scope) = create_scope(|| untrack(|| realize(content)));
        let identical = match &old {
            Some((old_nodes, _)) => old_nodes == &nodes,
            None => false,
        };
        if !identical {
            target.set_children(nodes.clone());
            target.notify_update();
        }
        *previous.borrow_mut() = Some((nodes, scope));
    });

    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessNode;
    use crate::render::platform::PlatformNode as _;
    use crate::signals::{create_scope as scope, signal};

    #[test]
    fn test_append_static_shapes() {
        let root = HeadlessNode::create_container("root");
        let target = root.clone();
        let ((), _scope) = scope(move || {
            append(&target, Content::text("hello"));
            append(&target, Content::Empty);
            append(
                &target,
                Content::Many(vec![Content::text("a"), Content::text("b")]),
            );
        });
        assert_eq!(root.child_count(), 3);
        assert_eq!(root.text_content(), "helloab");
    }

    #[test]
    fn test_reactive_text_updates_in_place() {
        let root = HeadlessNode::create_container("root");
        let target = root.clone();
        let count = signal(0);
        let count2 = count.clone();
        let ((), _scope) = scope(move || {
            append(&target, Content::from(count2));
        });

        assert_eq!(root.text_content(), "0");
        let before = root.child_count();
        count.set(7);
        assert_eq!(root.text_content(), "7");
        assert_eq!(root.child_count(), before, "update must not add nodes");
    }

    #[test]
    fn test_fragment_replaces_children() {
        let root = HeadlessNode::create_container("root");
        let target = root.clone();
        let flag = signal(false);
        let flag2 = flag.clone();
        let ((), _scope) = scope(move || {
            append(
                &target,
                Content::dynamic(move || {
                    if flag2.get() {
                        Content::text("on")
                    } else {
                        Content::text("off")
                    }
                }),
            );
        });

        assert_eq!(root.text_content(), "off");
        flag.set(true);
        assert_eq!(root.text_content(), "on");
    }

    #[test]
    fn test_fragment_short_circuits_on_same_node() {
        let root = HeadlessNode::create_container("root");
        let target = root.clone();
        let bump = signal(0);
        let bump2 = bump.clone();
        // The thunk depends on `bump` but always yields the same node.
        let stable = HeadlessNode::create_text("stable");
        let stable2 = stable.clone();
        let ((), _scope) = scope(move || {
            append(
                &target,
                Content::dynamic(move || {
                    let _ = bump2.get();
                    Content::node(stable2.clone())
                }),
            );
        });

        let container = root.child(0);
        let swaps_before = container.update_count();
        bump.set(1);
        bump.set(2);
        assert_eq!(
            container.update_count(),
            swaps_before,
            "identical nodes must not touch the platform"
        );
        assert_eq!(root.text_content(), "stable");
    }

    #[test]
    fn test_component_descriptor_defers_execution() {
        use std::cell::Cell;
        let executed = Rc::new(Cell::new(false));
        let executed2 = executed.clone();

        let view: Content<HeadlessNode> = element::component("Probe", move || {
            executed2.set(true);
            Content::text("probe")
        });
        assert!(!executed.get(), "component must not run at build time");

        let root = HeadlessNode::create_container("root");
        let target = root.clone();
        let ((), _scope) = scope(move || append(&target, view));
        assert!(executed.get(), "component runs when appended");
    }
}

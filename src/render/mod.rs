//! Platform-abstract fine-grained renderer.
//!
//! The renderer attaches effects at the finest granularity the content
//! allows: one effect per reactive text node, one per reactive attribute,
//! one per dynamic fragment. A state change therefore touches exactly the
//! leaves that read it; there is no tree diffing.

pub mod attrs;
pub mod content;
pub mod element;
pub mod headless;
pub mod insert;
pub mod platform;

pub use attrs::{AttrBinding, StyleBinding};
pub use content::Content;
pub use element::{component, el, Descriptor, ElementBuilder};
pub use headless::HeadlessNode;
pub use insert::{append, realize};
pub use platform::{AttrValue, EventHandler, EventPayload, PlatformNode};

use crate::signals::{create_scope, Owner};

/// Handle returned by [`render`]; disposing it unmounts the tree and runs
/// every cleanup registered beneath it.
pub struct RenderHandle {
    root: Owner,
}

impl RenderHandle {
    /// The root scope of the rendered tree.
    pub fn owner(&self) -> &Owner {
        &self.root
    }

    /// Unmount: dispose the root scope and everything beneath it.
    pub fn dispose(self) {
        self.root.dispose();
    }
}

/// Mount `factory`'s content into `container` under a fresh root scope.
///
/// Synchronous: when this returns, the tree is built, all initial effects
/// have run, and deferred mounts have fired.
pub fn render<N, C>(factory: impl FnOnce() -> C + 'static, container: &N) -> RenderHandle
where
    N: PlatformNode,
    C: Into<Content<N>>,
{
    let container = container.clone();
    let ((), root) = create_scope(move || {
        insert::append(&container, factory().into());
    });
    RenderHandle { root }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{on_cleanup, on_mount, signal};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_render_mounts_and_disposes() {
        let root = HeadlessNode::create_container("app");
        let cleaned = Rc::new(Cell::new(false));
        let cleaned2 = cleaned.clone();

        let handle = render(
            move || {
                on_cleanup(move || cleaned2.set(true));
                Content::text("hello")
            },
            &root,
        );
        assert_eq!(root.text_content(), "hello");

        handle.dispose();
        assert!(cleaned.get(), "dispose must run cleanups");
    }

    #[test]
    fn test_render_runs_mounts_after_build() {
        let root = HeadlessNode::create_container("app");
        let mounted = Rc::new(Cell::new(false));
        let mounted2 = mounted.clone();

        let _handle = render(
            move || {
                on_mount(move || mounted2.set(true));
                Content::text("x")
            },
            &root,
        );
        assert!(mounted.get(), "mount callbacks fire at the render boundary");
    }

    #[test]
    fn test_disposed_tree_stops_reacting() {
        let root = HeadlessNode::create_container("app");
        let count = signal(0);
        let count2 = count.clone();

        let handle = render(move || Content::from(count2), &root);
        assert_eq!(root.text_content(), "0");

        handle.dispose();
        count.set(5);
        assert_eq!(
            root.text_content(),
            "0",
            "bindings must not fire after unmount"
        );
    }
}

//! Out-of-tree rendering.
//!
//! `portal` renders its child into an arbitrary target node while leaving
//! a marker at the portal's natural position. The child's scope attaches
//! to the portal's owner, so disposing any ancestor removes the projected
//! nodes from the target.

use crate::render::{realize, Content, PlatformNode};
use crate::signals::{create_scope, on_cleanup};

/// Render `child` into `target`, returning a marker for the portal's
/// in-tree position.
pub fn portal<N>(target: &N, child: impl FnOnce() -> Content<N> + 'static) -> Content<N>
where
    N: PlatformNode,
{
    let marker = N::create_marker("portal");
    let target = target.clone();

    let (nodes, _scope) = create_scope(move || realize(child()));
    for node in &nodes {
        target.append_child(node);
    }
    target.notify_update();

    let remove_target = target.clone();
    on_cleanup(move || {
        for node in &nodes {
            remove_target.remove_child(node);
        }
        remove_target.notify_update();
    });

    Content::Node(marker)
}

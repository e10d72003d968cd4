//! # glint
//!
//! Fine-grained reactive UI framework for Rust terminals.
//!
//! glint is built around a push/pull reactive core: writable signals,
//! lazy deriveds and scheduled effects form a dependency graph that
//! propagates changes glitch-free, in topological order, with O(1)
//! subscription management. The renderer sits directly on that core and
//! attaches effects at the finest possible granularity - a single text
//! node, a single attribute, a single list entry - so a state change
//! updates exactly the leaves that read it. There is no virtual-DOM diff.
//!
//! ## Architecture
//!
//! ```text
//! signals (graph -> scheduler -> owners -> context)
//!    |
//! render (platform trait, content model, descriptors, bindings)
//!    |
//! primitives (each / when / branch / catch / defer / portal)
//!    |
//! terminal (node tree -> taffy layout -> frame buffer -> diff output)
//! ```
//!
//! The renderer core is back-end agnostic: anything implementing
//! [`render::PlatformNode`] can host a tree. The crate ships the terminal
//! back-end and a headless one for tests and host-less rendering.
//!
//! ## Example
//!
//! ```ignore
//! use glint::prelude::*;
//!
//! fn counter() -> Content<TermNode> {
//!     let count = signal(0);
//!     let label = count.clone();
//!     el("box")
//!         .attr("border", true)
//!         .on("key", move |_| count.update(|c| c + 1))
//!         .child(el("text").child(Content::from(label)).build())
//!         .build()
//! }
//!
//! fn main() -> Result<(), glint::RenderError> {
//!     glint::render_terminal(|| component("Counter", counter), Default::default())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`signals`] - the reactive graph, scheduler, owners, context
//! - [`render`] - the platform-abstract fine-grained renderer
//! - [`primitives`] - structural components (lists, branches, boundaries)
//! - [`terminal`] - the terminal back-end
//! - [`error`] - error taxonomy

pub mod error;
pub mod primitives;
pub mod render;
pub mod signals;
pub mod terminal;

pub use error::{RenderError, RuntimeError, UserError};

pub use signals::{
    batch, create_context, create_context_optional, create_scope, current_owner, derived,
    derived_with_equality, effect, effect_with_cleanup, on_cleanup, on_mount, pending_guard,
    provide_context, resource, set_cycle_limit, set_error_hook, signal, signal_with_equality,
    untrack, use_context, AsyncState, CleanupFn, Context, Derived, Effect, Owner, PendingGuard,
    Resource, Signal,
};

pub use render::{
    append, component, el, realize, render, AttrValue, Content, Descriptor, ElementBuilder,
    EventPayload, HeadlessNode, PlatformNode, RenderHandle,
};

pub use primitives::{
    arm, branch, branch_or, catch_boundary, defer, each, each_or, portal, when, when_or, Arm,
    EachEntry, ResetFn,
};

pub use terminal::{render_terminal, TermNode, TerminalOptions};

/// Everything a typical application imports.
pub mod prelude {
    pub use crate::error::{RenderError, UserError};
    pub use crate::primitives::{
        arm, branch, branch_or, catch_boundary, defer, each, each_or, portal, when, when_or,
        EachEntry,
    };
    pub use crate::render::{
        component, el, render, AttrValue, Content, EventPayload, PlatformNode, RenderHandle,
    };
    pub use crate::signals::{
        batch, create_context, create_scope, derived, effect, effect_with_cleanup, on_cleanup,
        on_mount, provide_context, resource, signal, untrack, use_context, AsyncState, Derived,
        Effect, Owner, Resource, Signal,
    };
    pub use crate::terminal::{render_terminal, TermNode, TerminalOptions};
}

//! Fine-grained reactive core.
//!
//! A push/pull hybrid: writes push staleness down the graph and schedule
//! effects; reads pull deriveds up to date lazily. The scheduler flushes
//! effects in topological order (by level), so within one flush no effect
//! observes a half-propagated state.
//!
//! Layers, leaf-first:
//! - [`cell`] - the graph: one record type for sources, deriveds and
//!   effects, bidirectional slot-indexed edges, version-based staleness.
//! - [`scheduler`] - batching, the pending-effect queue, the topological
//!   flush, cycle detection.
//! - [`owner`] - ownership scopes collecting cells and cleanups; disposal
//!   is the unit of teardown.
//! - [`context`] - values propagated along the owner tree.

pub(crate) mod cell;
pub(crate) mod runtime;

pub mod context;
pub mod derived;
pub mod effect;
pub mod owner;
pub mod resource;
pub mod scheduler;
pub mod signal;

pub use cell::CleanupFn;
pub use context::{create_context, create_context_optional, provide_context, use_context, Context};
pub use derived::{derived, derived_with_equality, Derived};
pub use effect::{effect, effect_with_cleanup, Effect};
pub use owner::{create_scope, current_owner, on_cleanup, on_mount, Owner};
pub use resource::{pending_guard, resource, AsyncState, PendingGuard, Resource};
pub use runtime::{batch, untrack};
pub use scheduler::{set_cycle_limit, set_error_hook};
pub use signal::{signal, signal_with_equality, Signal};

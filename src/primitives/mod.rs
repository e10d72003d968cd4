//! Structural components - reactive control flow over the renderer.
//!
//! Every component here renders into a transparent container node and
//! replaces the container's children on update, never the container
//! itself. Branch/list lifetimes are managed with one owner scope per
//! branch or list entry, so teardown is always a single scope disposal.

pub mod branch;
pub mod catch;
pub mod defer;
pub mod each;
pub mod portal;
pub mod when;

pub use branch::{arm, branch, branch_or, Arm};
pub use catch::{catch_boundary, ResetFn};
pub use defer::defer;
pub use each::{each, each_or, EachEntry};
pub use portal::portal;
pub use when::{when, when_or};

//! Error taxonomy.
//!
//! Three families of failures exist:
//! - [`UserError`] - raised by user-supplied code (effect bodies, render
//!   functions). Travels to the nearest error boundary, or to the host.
//! - [`RuntimeError`] - raised by the scheduler itself (cycle detection).
//!   Reported through the error hook; never silently swallowed.
//! - [`RenderError`] - raised by renderer entry points (missing terminal,
//!   I/O failures while drawing).
//!
//! Disposed-cell access is deliberately NOT an error value: reads return the
//! last known value and writes are ignored, both with a `log::warn!`.

use std::any::Any;

use thiserror::Error;

/// An error raised by user-supplied code.
///
/// Constructed from a panic payload when an effect or render function
/// panics inside an error boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl UserError {
    /// Create a user error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extract a user error from a panic payload.
    ///
    /// Panic payloads are almost always `&str` or `String`; anything else
    /// is reported opaquely.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self { message }
    }
}

/// Errors raised by the reactive scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// An effect re-scheduled itself for `limit` consecutive cycles and was
    /// disposed to break the loop.
    #[error("cycle limit exceeded: effect re-scheduled itself {limit} cycles in a row")]
    CycleLimitExceeded {
        /// The configured cycle limit at the time of detection.
        limit: u32,
    },

    /// A user error escaped every boundary during a flush.
    #[error(transparent)]
    User(#[from] UserError),
}

/// Errors raised by renderer entry points.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The terminal renderer was started without a usable terminal
    /// (stdout is not a tty). Fatal at startup.
    #[error("no terminal platform available (stdout is not a tty)")]
    PlatformUnavailable,

    /// Terminal I/O failed while entering/leaving screen modes or drawing.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

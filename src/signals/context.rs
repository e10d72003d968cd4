//! Context propagation along the owner tree.
//!
//! A context binds a value on the owner that is current when
//! [`provide_context`] runs; [`use_context`] walks the owner chain upward
//! and falls back to the context default. Because component descriptors
//! execute under a child owner created at append time, providers
//! established by ancestors are always visible to descendants - the
//! reason descriptors exist at all.

use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::UserError;

use super::owner::{current_record, OwnerRecord};

/// Reserved key for the error-boundary trap installed by `catch_boundary`.
pub(crate) const ERROR_TRAP_KEY: u64 = 1;
/// Reserved key for the pending-work counter installed by `defer`.
pub(crate) const DEFER_KEY: u64 = 2;
/// First key handed out to user contexts.
const FIRST_USER_KEY: u64 = 16;

thread_local! {
    static NEXT_KEY: Cell<u64> = const { Cell::new(FIRST_USER_KEY) };
}

/// A typed context handle.
///
/// Cheap to clone; all clones refer to the same binding key.
pub struct Context<T: 'static> {
    key: u64,
    default: Option<Rc<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: self.default.clone(),
            _marker: PhantomData,
        }
    }
}

/// Create a context with a default value returned when no provider is in
/// scope.
pub fn create_context<T: 'static>(default: T) -> Context<T> {
    Context {
        key: NEXT_KEY.with(|k| {
            let key = k.get();
            k.set(key + 1);
            key
        }),
        default: Some(Rc::new(default)),
        _marker: PhantomData,
    }
}

/// Create a context with no default; `use_context` yields `None` outside a
/// provider.
pub fn create_context_optional<T: 'static>() -> Context<T> {
    Context {
        key: NEXT_KEY.with(|k| {
            let key = k.get();
            k.set(key + 1);
            key
        }),
        default: None,
        _marker: PhantomData,
    }
}

/// Bind `value` for the current owner subtree and run `f`.
///
/// The binding stays attached to the owner after `f` returns, so cells and
/// descriptors created inside `f` keep seeing it for their whole lifetime.
pub fn provide_context<T: 'static, R>(context: &Context<T>, value: T, f: impl FnOnce() -> R) -> R {
    provide_raw(context.key, Rc::new(value) as Rc<dyn Any>);
    f()
}

/// Read the nearest provided value, or the context default.
pub fn use_context<T: 'static>(context: &Context<T>) -> Option<Rc<T>> {
    if let Some(record) = current_record() {
        if let Some(value) = lookup_raw(&record, context.key) {
            if let Ok(typed) = value.downcast::<T>() {
                return Some(typed);
            }
        }
    }
    context.default.clone()
}

/// Bind a type-erased value on the current owner.
pub(crate) fn provide_raw(key: u64, value: Rc<dyn Any>) {
    match current_record() {
        Some(record) => {
            record.contexts.borrow_mut().insert(key, value);
        }
        None => log::warn!("context provided outside a scope; binding dropped"),
    }
}

/// Walk the owner chain for a binding.
pub(crate) fn lookup_raw(record: &Rc<OwnerRecord>, key: u64) -> Option<Rc<dyn Any>> {
    let mut current = Some(record.clone());
    while let Some(record) = current {
        if let Some(value) = record.contexts.borrow().get(&key) {
            return Some(value.clone());
        }
        current = record.parent_record();
    }
    None
}

// =============================================================================
// Error trap (consumed by the scheduler, installed by catch_boundary)
// =============================================================================

/// Handler installed by an error boundary. Effects that panic while an
/// ancestor owner carries one of these deliver the error here instead of
/// unwinding to the host.
pub(crate) struct ErrorTrap {
    pub handler: Rc<dyn Fn(UserError)>,
}

/// Find the nearest error trap above `record`.
pub(crate) fn error_trap_for(record: &Rc<OwnerRecord>) -> Option<Rc<ErrorTrap>> {
    lookup_raw(record, ERROR_TRAP_KEY).and_then(|value| value.downcast::<ErrorTrap>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::owner::create_scope;

    #[test]
    fn test_default_without_provider() {
        let ctx = create_context(7_i32);
        let (value, _scope) = create_scope(|| use_context(&ctx).map(|v| *v));
        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_provider_shadows_default() {
        let ctx = create_context(7_i32);
        let (value, _scope) = create_scope(|| {
            provide_context(&ctx, 42, || {
                let (inner, _child) = create_scope(|| use_context(&ctx).map(|v| *v));
                inner
            })
        });
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_nested_provider_wins() {
        let ctx = create_context(0_i32);
        let (value, _scope) = create_scope(|| {
            provide_context(&ctx, 1, || {
                let (inner, _child) = create_scope(|| {
                    provide_context(&ctx, 2, || use_context(&ctx).map(|v| *v))
                });
                inner
            })
        });
        assert_eq!(value, Some(2));
    }

    #[test]
    fn test_optional_context_empty() {
        let ctx = create_context_optional::<String>();
        let (value, _scope) = create_scope(|| use_context(&ctx));
        assert!(value.is_none());
    }
}

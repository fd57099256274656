#![forbid(unsafe_code)]

//! Contract with the reactive host.
//!
//! The engine never tracks dependencies itself. A host implementing
//! [`ReactiveHost`] is injected at construction time; bindings then wrap their
//! evaluation cycle in [`ReactiveHost::effect`] and rely on the host to re-run
//! it after any tracked read changes.
//!
//! # Contract
//!
//! 1. `effect` runs the body once before returning, then again after every
//!    change to something the body read.
//! 2. The returned guard stops all further runs once disposed.
//! 3. `batch` runs its closure exactly once and coalesces the re-runs it
//!    triggers.
//! 4. The host prevents an effect from re-entering itself.

use std::rc::Rc;

use crate::value::Value;

/// Disposal handle for a host effect.
pub trait EffectGuard {
    fn dispose(&self);
}

/// Injected reactive primitives.
pub trait ReactiveHost {
    /// Run `body` now and whenever a dependency read inside it changes.
    fn effect(&self, body: Box<dyn FnMut()>) -> Box<dyn EffectGuard>;

    /// Run `f`, coalescing the effect re-runs it causes.
    fn batch(&self, f: &mut dyn FnMut());

    /// Whether `value` is tracked by this host.
    fn is_reactive(&self, value: &Value) -> bool {
        matches!(value, Value::Reactive(_))
    }
}

/// A host-owned value that can be read as a plain [`Value`].
pub trait ReactiveSource {
    /// Current plain value. Reading it inside an effect records a dependency.
    fn snapshot(&self) -> Value;
}

/// Shared handle to a [`ReactiveSource`].
#[derive(Clone)]
pub struct ReactiveRef(Rc<dyn ReactiveSource>);

impl ReactiveRef {
    pub fn new(source: impl ReactiveSource + 'static) -> Self {
        Self(Rc::new(source))
    }

    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.0.snapshot()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ReactiveRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReactiveRef").finish_non_exhaustive()
    }
}

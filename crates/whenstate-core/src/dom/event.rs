//! Events, callbacks and listener options.

use std::rc::Rc;

use crate::dom::Element;
use crate::value::Value;

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: String,
    pub target: Element,
}

/// Shared event callback. Two callbacks are the same listener only when they
/// point at the same closure.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callback")
    }
}

/// Options accepted by `add_event_listener`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl ListenerOptions {
    /// Read options the way the host does: a boolean means `capture`, an
    /// object carries named flags, anything else means defaults.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(capture) => Self {
                capture: *capture,
                ..Self::default()
            },
            Value::Object(map) => {
                let flag = |name: &str| map.get(name).is_some_and(Value::is_truthy);
                Self {
                    capture: flag("capture"),
                    once: flag("once"),
                    passive: flag("passive"),
                }
            }
            _ => Self::default(),
        }
    }
}

/// A listener attached to an element.
#[derive(Debug, Clone)]
pub(crate) struct RegisteredListener {
    pub(crate) kind: String,
    pub(crate) callback: Callback,
    pub(crate) options: ListenerOptions,
}

impl RegisteredListener {
    /// Host listener identity: event type, callback and capture flag.
    pub(crate) fn is(&self, kind: &str, callback: &Callback, capture: bool) -> bool {
        self.kind == kind && self.callback.ptr_eq(callback) && self.options.capture == capture
    }
}

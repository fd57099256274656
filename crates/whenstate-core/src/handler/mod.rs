#![forbid(unsafe_code)]

//! Property application.
//!
//! A [`HandlerTable`] turns one config key/value pair into a mutation on one
//! element. Handlers are tried in order and the first whose
//! [`Handler::test`] accepts applies the pair. The table always ends with the
//! `attribute` fallback, which writes primitive values as attributes;
//! [`HandlerTable::insert`] keeps it there.

mod builtin;
mod listeners;

use std::rc::Rc;

use tracing::trace;

pub use builtin::{
    AddListenerHandler, AttributeFallbackHandler, AttributesHandler, ClassListHandler,
    DatasetHandler, EventPropertyHandler, PropertyHandler, RemoveAttributeHandler,
    RemoveListenerHandler, StyleHandler,
};
pub use listeners::{ListenerRecord, ListenerRecords};

use crate::dom::Element;
use crate::error::{Error, Result};
use crate::value::Value;

/// Name of the terminal primitive-to-attribute handler.
pub const FALLBACK_HANDLER: &str = "attribute";

/// Strategy applying one config key to one element.
pub trait Handler {
    fn test(&self, key: &str, value: &Value, element: &Element) -> bool;

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()>;
}

/// Handler built from two closures.
pub struct FnHandler<T, A> {
    test: T,
    apply: A,
}

impl<T, A> FnHandler<T, A>
where
    T: Fn(&str, &Value, &Element) -> bool,
    A: Fn(&Element, &Value, &str) -> Result<()>,
{
    pub fn new(test: T, apply: A) -> Self {
        Self { test, apply }
    }
}

impl<T, A> Handler for FnHandler<T, A>
where
    T: Fn(&str, &Value, &Element) -> bool,
    A: Fn(&Element, &Value, &str) -> Result<()>,
{
    fn test(&self, key: &str, value: &Value, element: &Element) -> bool {
        (self.test)(key, value, element)
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        (self.apply)(element, value, key)
    }
}

#[derive(Clone)]
struct Entry {
    name: Rc<str>,
    handler: Rc<dyn Handler>,
}

/// Ordered handler strategies ending with the attribute fallback.
#[derive(Clone)]
pub struct HandlerTable {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &*e.name))
            .finish()
    }
}

impl HandlerTable {
    /// Only the attribute fallback.
    #[must_use]
    pub fn fallback_only() -> Self {
        Self {
            entries: vec![Entry {
                name: Rc::from(FALLBACK_HANDLER),
                handler: Rc::new(AttributeFallbackHandler),
            }],
        }
    }

    /// Built-in handlers. `records` backs the listener handlers.
    #[must_use]
    pub fn builtin(records: Rc<ListenerRecords>) -> Self {
        let mut table = Self::fallback_only();
        let builtins: [(&str, Rc<dyn Handler>); 9] = [
            ("style", Rc::new(StyleHandler)),
            ("classList", Rc::new(ClassListHandler)),
            ("attrs", Rc::new(AttributesHandler)),
            ("removeAttribute", Rc::new(RemoveAttributeHandler)),
            ("dataset", Rc::new(DatasetHandler)),
            (
                "addEventListener",
                Rc::new(AddListenerHandler::new(Rc::clone(&records))),
            ),
            ("removeEventListener", Rc::new(RemoveListenerHandler::new(records))),
            ("eventProperty", Rc::new(EventPropertyHandler)),
            ("property", Rc::new(PropertyHandler)),
        ];
        for (name, handler) in builtins {
            table.insert_before_fallback(name, handler);
        }
        table
    }

    /// Insert a handler just before the fallback.
    pub fn insert(&mut self, name: &str, handler: Rc<dyn Handler>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::registry(name, "handler name must not be blank"));
        }
        if name == FALLBACK_HANDLER {
            return Err(Error::registry(name, "name is reserved for the fallback handler"));
        }
        self.insert_before_fallback(name, handler);
        Ok(())
    }

    fn insert_before_fallback(&mut self, name: &str, handler: Rc<dyn Handler>) {
        let at = self.entries.len().saturating_sub(1);
        self.entries.insert(
            at,
            Entry {
                name: Rc::from(name),
                handler,
            },
        );
    }

    /// Names in evaluation order; the last is always [`FALLBACK_HANDLER`].
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true: the fallback is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply one key to one element. Returns `Ok(false)` when no handler
    /// accepted the pair.
    pub fn apply_property(&self, element: &Element, key: &str, value: &Value) -> Result<bool> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.handler.test(key, value, element))
        else {
            return Ok(false);
        };
        trace!(handler = &*entry.name, key, "applying property");
        entry.handler.apply(element, value, key)?;
        Ok(true)
    }
}

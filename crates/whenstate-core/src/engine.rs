#![forbid(unsafe_code)]

//! The conditions engine and its registry.
//!
//! A [`ConditionsEngine`] owns one [`EngineConfig`] (matcher table, handler
//! table, listener records) shared by every binding it creates. Engines are
//! independent of each other: registering a matcher on one never affects
//! another.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use whenstate_core::{BindingOptions, ConditionSet, ConditionsEngine, Document};
//!
//! let document = Document::new();
//! let out = document.create_element("p");
//! out.set_attribute("id", "out").unwrap();
//! document.append(&out);
//!
//! let engine = ConditionsEngine::new(document);
//! let conditions = ConditionSet::from_json(json!({
//!     "1-3": {"textContent": "low"},
//!     "4-10": {"textContent": "high"},
//!     "default": {"textContent": "other"},
//! }))
//! .unwrap();
//! engine.apply(5, conditions, "#out");
//! assert_eq!(out.text_content(), "high");
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::binding::{Binding, Cycle, ValueSource};
use crate::config::ConditionSource;
use crate::dom::Document;
use crate::error::Result;
use crate::handler::{Handler, HandlerTable, ListenerRecords};
use crate::matcher::{Matcher, MatcherTable};
use crate::options::{BindingOptions, EngineOptions};
use crate::reactive::ReactiveHost;
use crate::target::{ElementCache, Target, TargetResolver};
use crate::value::Value;

/// Registries shared by all bindings of one engine.
pub struct EngineConfig {
    matchers: RefCell<MatcherTable>,
    handlers: RefCell<HandlerTable>,
    listeners: Rc<ListenerRecords>,
}

impl EngineConfig {
    #[must_use]
    pub fn new(options: &EngineOptions) -> Self {
        let listeners = Rc::new(ListenerRecords::new());
        Self {
            matchers: RefCell::new(MatcherTable::builtin(options.cache_patterns)),
            handlers: RefCell::new(HandlerTable::builtin(Rc::clone(&listeners))),
            listeners,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("matchers", &self.matchers.borrow())
            .field("handlers", &self.handlers.borrow())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

pub(crate) struct EngineShared {
    pub(crate) config: EngineConfig,
    pub(crate) resolver: TargetResolver,
    pub(crate) host: Option<Rc<dyn ReactiveHost>>,
    pub(crate) options: EngineOptions,
}

impl EngineShared {
    /// Snapshot taken per cycle so handlers may register during dispatch.
    pub(crate) fn matchers(&self) -> MatcherTable {
        self.config.matchers.borrow().clone()
    }

    pub(crate) fn handlers(&self) -> HandlerTable {
        self.config.handlers.borrow().clone()
    }
}

/// Builder for [`ConditionsEngine`].
#[must_use]
pub struct EngineBuilder {
    document: Document,
    host: Option<Rc<dyn ReactiveHost>>,
    cache: Option<Rc<dyn ElementCache>>,
    options: EngineOptions,
}

impl EngineBuilder {
    /// Inject the reactive host. Without one every binding is static.
    pub fn reactive_host(mut self, host: impl ReactiveHost + 'static) -> Self {
        self.host = Some(Rc::new(host));
        self
    }

    pub fn shared_reactive_host(mut self, host: Rc<dyn ReactiveHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Consult `cache` before the document when resolving selectors.
    pub fn element_cache(mut self, cache: impl ElementCache + 'static) -> Self {
        self.cache = Some(Rc::new(cache));
        self
    }

    pub fn shared_element_cache(mut self, cache: Rc<dyn ElementCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(self) -> ConditionsEngine {
        ConditionsEngine {
            shared: Rc::new(EngineShared {
                config: EngineConfig::new(&self.options),
                resolver: TargetResolver::new(self.document, self.cache),
                host: self.host,
                options: self.options,
            }),
        }
    }
}

/// Declarative conditional-update engine.
#[derive(Clone)]
pub struct ConditionsEngine {
    shared: Rc<EngineShared>,
}

impl std::fmt::Debug for ConditionsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionsEngine")
            .field("config", &self.shared.config)
            .field("reactive", &self.shared.host.is_some())
            .field("options", &self.shared.options)
            .finish()
    }
}

impl ConditionsEngine {
    /// Engine without a reactive host.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self::builder(document).build()
    }

    pub fn builder(document: Document) -> EngineBuilder {
        EngineBuilder {
            document,
            host: None,
            cache: None,
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        self.shared.resolver.document()
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.shared.options
    }

    #[must_use]
    pub fn listener_records(&self) -> &ListenerRecords {
        &self.shared.config.listeners
    }

    /// Bind `conditions` over `value` to `target`.
    ///
    /// The binding is reactive when `options.reactive` is set, a host was
    /// injected, and the value is a getter or a host-tracked value.
    /// Otherwise the cycle runs once now.
    pub fn when_state(
        &self,
        value: impl Into<ValueSource>,
        conditions: impl Into<ConditionSource>,
        target: impl Into<Target>,
        options: BindingOptions,
    ) -> Binding {
        let cycle = Rc::new(Cycle::new(
            Rc::clone(&self.shared),
            value.into(),
            conditions.into(),
            target.into(),
        ));

        let host = self
            .shared
            .host
            .as_ref()
            .filter(|_| options.reactive)
            .filter(|host| match cycle.value() {
                ValueSource::Getter(_) => true,
                ValueSource::Static(value) => host.is_reactive(value),
            });

        match host {
            Some(host) => {
                let body = Rc::clone(&cycle);
                let guard = host.effect(Box::new(move || {
                    body.run();
                }));
                Binding::new_reactive(cycle, guard)
            }
            None => Binding::new_static(cycle),
        }
    }

    /// Evaluate once against a fixed value.
    pub fn apply(
        &self,
        value: impl Into<Value>,
        conditions: impl Into<ConditionSource>,
        target: impl Into<Target>,
    ) -> &Self {
        let binding = self.when_state(
            ValueSource::Static(value.into()),
            conditions,
            target,
            BindingOptions::static_only(),
        );
        drop(binding);
        self
    }

    /// [`when_state`](Self::when_state) with reactive tracking requested.
    pub fn watch(
        &self,
        value: impl Into<ValueSource>,
        conditions: impl Into<ConditionSource>,
        target: impl Into<Target>,
    ) -> Binding {
        self.when_state(value, conditions, target, BindingOptions::default())
    }

    /// Run `f` with effect re-runs coalesced by the host.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let Some(host) = &self.shared.host else {
            return f();
        };
        let mut slot = BatchSlot::Pending(f);
        host.batch(&mut || slot.run());
        slot.finish()
    }

    /// Append a matcher. Rejected registrations are logged and ignored.
    pub fn register_matcher(&self, name: &str, matcher: impl Matcher + 'static) -> &Self {
        if let Err(err) = self.try_register_matcher(name, matcher) {
            warn!(matcher = name, error = %err, "matcher registration rejected");
        }
        self
    }

    pub fn try_register_matcher(
        &self,
        name: &str,
        matcher: impl Matcher + 'static,
    ) -> Result<&Self> {
        self.shared
            .config
            .matchers
            .borrow_mut()
            .push(name, Rc::new(matcher))?;
        debug!(matcher = name, "matcher registered");
        Ok(self)
    }

    /// Insert a handler before the attribute fallback. Rejected
    /// registrations are logged and ignored.
    pub fn register_handler(&self, name: &str, handler: impl Handler + 'static) -> &Self {
        if let Err(err) = self.try_register_handler(name, handler) {
            warn!(handler = name, error = %err, "handler registration rejected");
        }
        self
    }

    pub fn try_register_handler(
        &self,
        name: &str,
        handler: impl Handler + 'static,
    ) -> Result<&Self> {
        self.shared
            .config
            .handlers
            .borrow_mut()
            .insert(name, Rc::new(handler))?;
        debug!(handler = name, "handler registered");
        Ok(self)
    }

    /// Matcher names in evaluation order.
    #[must_use]
    pub fn matchers(&self) -> Vec<String> {
        self.shared.config.matchers.borrow().names()
    }

    /// Handler names in evaluation order, fallback last.
    #[must_use]
    pub fn handlers(&self) -> Vec<String> {
        self.shared.config.handlers.borrow().names()
    }

    #[must_use]
    pub fn matches_condition(&self, value: &Value, condition: &str) -> bool {
        self.shared.matchers().matches_condition(&value.resolved(), condition)
    }
}

enum BatchSlot<F, R> {
    Pending(F),
    Running,
    Done(R),
}

impl<F: FnOnce() -> R, R> BatchSlot<F, R> {
    fn run(&mut self) {
        if let Self::Pending(f) = std::mem::replace(self, Self::Running) {
            *self = Self::Done(f());
        }
    }

    /// A host that never invoked the closure gets it run here.
    fn finish(mut self) -> R {
        self.run();
        match self {
            Self::Done(result) => result,
            Self::Pending(_) | Self::Running => {
                unreachable!("batch closure left without producing a result")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::CycleOutcome;
    use crate::config::{Config, ConditionSet};
    use crate::handler::FnHandler;
    use crate::matcher::FnMatcher;
    use serde_json::json;

    fn engine_with(id: &str) -> (ConditionsEngine, crate::dom::Element) {
        let document = Document::new();
        let el = document.create_element("div");
        el.set_attribute("id", id).expect("id");
        document.append(&el);
        (ConditionsEngine::new(document), el)
    }

    #[test]
    fn registry_names_and_fallback_position() {
        let (engine, _) = engine_with("x");
        engine
            .register_matcher("even", FnMatcher::new(|c, _| c == "even", |v, _| {
                v.as_f64().is_some_and(|n| n % 2.0 == 0.0)
            }))
            .register_handler("noop", FnHandler::new(|k, _, _| k == "noop", |_, _, _| Ok(())));
        assert_eq!(engine.matchers().last().map(String::as_str), Some("even"));
        let handlers = engine.handlers();
        assert_eq!(handlers.last().map(String::as_str), Some("attribute"));
        assert_eq!(handlers[handlers.len() - 2], "noop");
        assert!(engine.matches_condition(&Value::from(4), "even"));
    }

    #[test]
    fn rejected_registration_is_a_no_op() {
        let (engine, _) = engine_with("x");
        let before = engine.handlers();
        engine.register_handler("attribute", FnHandler::new(|_, _, _| true, |_, _, _| Ok(())));
        assert_eq!(engine.handlers(), before);
        assert!(
            engine
                .try_register_matcher("", FnMatcher::new(|_, _| true, |_, _| true))
                .is_err()
        );
    }

    #[test]
    fn engines_are_isolated() {
        let (a, _) = engine_with("x");
        let (b, _) = engine_with("y");
        a.register_matcher("extra", FnMatcher::new(|_, _| false, |_, _| false));
        assert_ne!(a.matchers().len(), b.matchers().len());
    }

    #[test]
    fn static_binding_without_host() {
        let (engine, el) = engine_with("out");
        let binding = engine.when_state(
            ValueSource::getter(|| Value::from(true)),
            ConditionSet::new().when("true", Config::new().with("textContent", "yes")),
            "#out",
            BindingOptions::default(),
        );
        assert!(!binding.is_reactive());
        assert_eq!(el.text_content(), "yes");
        assert_eq!(
            binding.last_outcome(),
            Some(CycleOutcome::Applied {
                condition: "true".into(),
                elements: 1
            })
        );
        el.set_property("textContent", Value::from("reset")).expect("reset");
        binding.update();
        assert_eq!(el.text_content(), "yes");
        assert_eq!(binding.run_count(), 2);
        binding.destroy();
    }

    #[test]
    fn apply_chains_and_default_goes_last() {
        let (engine, el) = engine_with("out");
        let set = ConditionSet::from_json(json!({
            "default": {"title": "other"},
            "1": {"title": "one"},
        }))
        .expect("set");
        engine.apply(1, set.clone(), "#out");
        assert_eq!(el.property("title"), Value::from("one"));
        engine.apply(2, set, "#out");
        assert_eq!(el.property("title"), Value::from("other"));
    }

    #[test]
    fn batch_without_host_runs_inline() {
        let (engine, _) = engine_with("x");
        assert_eq!(engine.batch(|| 41 + 1), 42);
    }
}

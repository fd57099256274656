#![forbid(unsafe_code)]

//! Bindings and the evaluation cycle.
//!
//! A cycle evaluates the driving value, evaluates the condition set (with the
//! default branch moved last), picks the first matching condition, resolves
//! the target and dispatches the config. Every failure ends the cycle with a
//! log event and a [`CycleOutcome`]; none of them end the binding.
//!
//! # Modes
//!
//! - **Reactive**: the cycle is the body of a host effect, so every tracked
//!   read inside it re-runs the cycle. The [`Binding`] owns the effect guard
//!   and disposes it on [`Binding::destroy`] or drop.
//! - **Static**: the cycle runs once at creation; [`Binding::update`] re-runs
//!   it and [`Binding::destroy`] does nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, debug_span, error, info};

use crate::config::ConditionSource;
use crate::dispatch::Dispatcher;
use crate::engine::EngineShared;
use crate::error::Result;
use crate::reactive::EffectGuard;
use crate::target::Target;
use crate::value::Value;

type Getter = Rc<dyn Fn() -> Result<Value>>;

/// Where a binding reads its driving value from.
#[derive(Clone)]
pub enum ValueSource {
    Static(Value),
    /// Called on every cycle; reads inside it are tracked in reactive mode.
    Getter(Getter),
}

impl ValueSource {
    pub fn getter(f: impl Fn() -> Value + 'static) -> Self {
        Self::Getter(Rc::new(move || Ok(f())))
    }

    pub fn try_getter(f: impl Fn() -> Result<Value> + 'static) -> Self {
        Self::Getter(Rc::new(f))
    }

    #[must_use]
    pub fn is_getter(&self) -> bool {
        matches!(self, Self::Getter(_))
    }

    /// Current plain value. Reactive values are read through.
    pub fn evaluate(&self) -> Result<Value> {
        match self {
            Self::Static(value) => Ok(value.resolved()),
            Self::Getter(f) => Ok(f()?.resolved()),
        }
    }
}

impl<T: Into<Value>> From<T> for ValueSource {
    fn from(value: T) -> Self {
        Self::Static(value.into())
    }
}

impl std::fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Getter(_) => f.write_str("Getter"),
        }
    }
}

/// How one cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `condition` matched and its config was dispatched to `elements`
    /// elements.
    Applied { condition: String, elements: usize },
    /// No condition matched; targets were left as they were.
    NoMatch,
    /// The target resolved to no elements.
    Unresolved,
    /// The value getter or condition factory failed.
    Failed(String),
}

impl CycleOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Matched condition, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        match self {
            Self::Applied { condition, .. } => Some(condition),
            _ => None,
        }
    }
}

pub(crate) struct Cycle {
    engine: Rc<EngineShared>,
    value: ValueSource,
    conditions: ConditionSource,
    target: Target,
    last: RefCell<Option<CycleOutcome>>,
    runs: Cell<usize>,
}

impl Cycle {
    pub(crate) fn new(
        engine: Rc<EngineShared>,
        value: ValueSource,
        conditions: ConditionSource,
        target: Target,
    ) -> Self {
        Self {
            engine,
            value,
            conditions,
            target,
            last: RefCell::new(None),
            runs: Cell::new(0),
        }
    }

    pub(crate) fn value(&self) -> &ValueSource {
        &self.value
    }

    pub(crate) fn run(&self) -> CycleOutcome {
        let span = debug_span!("whenstate.cycle", selector = %self.target.describe());
        let _guard = span.enter();
        self.runs.set(self.runs.get() + 1);
        let outcome = self.evaluate();
        *self.last.borrow_mut() = Some(outcome.clone());
        outcome
    }

    fn evaluate(&self) -> CycleOutcome {
        let value = match self.value.evaluate() {
            Ok(value) => value,
            Err(err) => {
                error!(error = %err, "value evaluation failed; cycle aborted");
                return CycleOutcome::Failed(err.to_string());
            }
        };
        let conditions = match self.conditions.evaluate() {
            Ok(conditions) => conditions,
            Err(err) => {
                error!(error = %err, "condition evaluation failed; cycle aborted");
                return CycleOutcome::Failed(err.to_string());
            }
        };

        let matchers = self.engine.matchers();
        let Some((condition, config)) = matchers.first_match(&value, &conditions) else {
            info!(
                value = %value,
                conditions = conditions.len(),
                "no condition matched; targets left untouched"
            );
            return CycleOutcome::NoMatch;
        };

        let elements = self.engine.resolver.resolve(&self.target);
        if elements.is_empty() {
            return CycleOutcome::Unresolved;
        }

        let handlers = self.engine.handlers();
        let report = Dispatcher::new(&handlers, self.engine.options.use_update_hook)
            .dispatch(&elements, config);
        debug!(
            condition,
            elements = report.elements,
            applied = report.applied,
            failed = report.failed,
            skipped = report.skipped,
            "condition applied"
        );
        CycleOutcome::Applied {
            condition: condition.to_string(),
            elements: elements.len(),
        }
    }
}

/// One live `when_state` binding.
#[must_use = "dropping a Binding disposes its effect"]
pub struct Binding {
    cycle: Rc<Cycle>,
    effect: RefCell<Option<Box<dyn EffectGuard>>>,
    reactive: bool,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("target", &self.cycle.target)
            .field("reactive", &self.reactive)
            .field("active", &self.is_active())
            .field("runs", &self.cycle.runs.get())
            .finish()
    }
}

impl Binding {
    pub(crate) fn new_static(cycle: Rc<Cycle>) -> Self {
        cycle.run();
        Self {
            cycle,
            effect: RefCell::new(None),
            reactive: false,
        }
    }

    pub(crate) fn new_reactive(cycle: Rc<Cycle>, guard: Box<dyn EffectGuard>) -> Self {
        Self {
            cycle,
            effect: RefCell::new(Some(guard)),
            reactive: true,
        }
    }

    /// Run the cycle again now.
    pub fn update(&self) -> CycleOutcome {
        self.cycle.run()
    }

    /// Dispose the effect. Static bindings have nothing to release.
    pub fn destroy(&self) {
        if let Some(guard) = self.effect.borrow_mut().take() {
            guard.dispose();
            debug!(selector = %self.cycle.target.describe(), "binding destroyed");
        }
    }

    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Reactive and not yet destroyed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effect.borrow().is_some()
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<CycleOutcome> {
        self.cycle.last.borrow().clone()
    }

    /// Cycles run so far, including the initial one.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.cycle.runs.get()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn static_source_reads_through_plain_values() {
        let source = ValueSource::from(5);
        assert!(!source.is_getter());
        assert_eq!(source.evaluate().expect("static"), Value::from(5));
    }

    #[test]
    fn getter_errors_propagate() {
        let source = ValueSource::try_getter(|| Err(Error::evaluation("boom")));
        assert!(source.is_getter());
        assert!(matches!(source.evaluate(), Err(Error::Evaluation { .. })));
    }

    #[test]
    fn outcome_accessors() {
        let applied = CycleOutcome::Applied {
            condition: "true".into(),
            elements: 1,
        };
        assert!(applied.is_applied());
        assert_eq!(applied.condition(), Some("true"));
        assert_eq!(CycleOutcome::NoMatch.condition(), None);
    }
}

#![forbid(unsafe_code)]

//! whenstate public facade.
//!
//! Re-exports the engine from `whenstate-core` and, with the default
//! `signals` feature, wires it to the `whenstate-reactive` runtime so
//! bindings re-run when an observable they read changes.
//!
//! ```
//! use serde_json::json;
//! use whenstate::{ConditionSet, Document, Observable, Value, ValueSource};
//!
//! let document = Document::new();
//! let badge = document.create_element("span");
//! badge.set_class_name("badge");
//! document.append(&badge);
//!
//! let count = Observable::new(0);
//! let engine = whenstate::engine(document);
//! let source = count.clone();
//! let _binding = engine.watch(
//!     ValueSource::getter(move || source.get().into()),
//!     ConditionSet::from_json(json!({
//!         "0": {"hidden": true},
//!         "default": {"hidden": false},
//!     }))
//!     .unwrap(),
//!     ".badge",
//! );
//! assert_eq!(badge.property("hidden"), Value::from(true));
//! count.set(3);
//! assert_eq!(badge.property("hidden"), Value::from(false));
//! ```

#[cfg(feature = "signals")]
mod host;

#[cfg(feature = "signals")]
pub use host::{SignalHost, tracked};

pub use whenstate_core::{
    Binding, BindingOptions, CATCH_ALL_CONDITION, Callback, ConditionSet, ConditionSource,
    ConditionsEngine, Config, CycleOutcome, DEFAULT_CONDITION, Document, EffectGuard, Element,
    ElementCache, ElementCollection, EngineBuilder, EngineOptions, Error, Event, FnHandler,
    FnMatcher, Handler, ListenerOptions, Matcher, ReactiveHost, Result, Target, Value, ValueSource,
};
#[cfg(feature = "signals")]
pub use whenstate_reactive::{BatchScope, Observable, Subscription};

pub mod prelude {
    pub use whenstate_core as core;
    #[cfg(feature = "signals")]
    pub use whenstate_reactive as signals;
}

/// Engine builder with the signal host installed.
#[cfg(feature = "signals")]
pub fn builder(document: Document) -> EngineBuilder {
    ConditionsEngine::builder(document).reactive_host(SignalHost)
}

/// Engine with the signal host and default options.
#[cfg(feature = "signals")]
#[must_use]
pub fn engine(document: Document) -> ConditionsEngine {
    builder(document).build()
}

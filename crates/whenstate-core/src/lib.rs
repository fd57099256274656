#![forbid(unsafe_code)]

//! Condition matching and property application.
//!
//! `whenstate-core` selects the first condition in an ordered set that
//! matches a driving value and applies that condition's config to one or
//! more elements. Bindings can re-run automatically through an injected
//! [`ReactiveHost`].
//!
//! # Pipeline
//!
//! ```text
//! ValueSource ─▶ MatcherTable ─▶ Dispatcher ─▶ TargetResolver ─▶ HandlerTable ─▶ Element
//!                (first match)   (shared, then indexed keys)      (per key)
//! ```
//!
//! # Failure model
//!
//! Nothing here is fatal. Unresolved targets, failing getters, bad patterns
//! and failing handlers each end one unit of work (a cycle, a condition or a
//! key) with a `tracing` event; the binding stays alive.

pub mod binding;
pub mod config;
pub mod dispatch;
pub mod dom;
pub mod engine;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod options;
pub mod reactive;
pub mod target;
pub mod value;

pub use binding::{Binding, CycleOutcome, ValueSource};
pub use config::{
    CATCH_ALL_CONDITION, ConditionSet, ConditionSource, Config, DEFAULT_CONDITION, index_key,
};
pub use dispatch::{DispatchReport, Dispatcher};
pub use dom::{Callback, Document, Element, Event, ListenerOptions};
pub use engine::{ConditionsEngine, EngineBuilder, EngineConfig};
pub use error::{Error, Result};
pub use handler::{FALLBACK_HANDLER, FnHandler, Handler, HandlerTable, ListenerRecords};
pub use matcher::{FnMatcher, Matcher, MatcherTable};
pub use options::{BindingOptions, EngineOptions};
pub use reactive::{EffectGuard, ReactiveHost, ReactiveRef, ReactiveSource};
pub use target::{ElementCache, ElementCollection, Target};
pub use value::{Map, Value};

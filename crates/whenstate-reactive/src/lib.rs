#![forbid(unsafe_code)]

//! Fine-grained reactive primitives for whenstate.
//!
//! This crate provides the change-tracking runtime that drives reactive
//! bindings:
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks and automatic dependency tracking.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`effect`] / [`EffectHandle`]: A side effect that runs immediately and
//!   re-runs whenever an observable read during its last run changes.
//! - [`batch`] / [`BatchScope`]: Defers effect re-runs until the outermost
//!   scope exits, so several writes cause a single re-run.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Effects are tracked through a thread-local observer stack: reading an
//! observable while an effect body runs records the effect as a dependent.
//! Observables hold only `Weak` references to effects, so an effect lives
//! exactly as long as its [`EffectHandle`].
//!
//! Dependencies are re-collected on every run. Each run bumps the effect's
//! epoch; a dependent entry recorded under an older epoch is stale and gets
//! pruned on the next notification instead of triggering a re-run.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications, no effect re-runs).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. An effect never runs re-entrantly. A write to one of its own
//!    dependencies from inside its body schedules exactly one follow-up run
//!    after the body returns.
//! 6. Within a `BatchScope`, values are updated immediately but effect
//!    re-runs are deferred until the outermost scope exits, and each effect
//!    runs at most once per flush round.

pub mod batch;
pub mod effect;
pub mod observable;

pub use batch::{BatchScope, batch};
pub use effect::{EffectHandle, effect, is_tracking, untrack};
pub use observable::{Observable, Subscription};

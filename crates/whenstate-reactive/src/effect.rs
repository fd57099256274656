#![forbid(unsafe_code)]

//! Self-tracking side effects.
//!
//! # Design
//!
//! [`effect`] wraps a closure in a shared `EffectNode` and runs it at once.
//! While the closure runs, the node sits on a thread-local observer stack;
//! every [`Observable`](crate::Observable) read during that time registers
//! the node as a dependent. A later write to any of those observables
//! re-runs the closure (or defers the re-run to the enclosing batch).
//!
//! # Invariants
//!
//! 1. The body never runs re-entrantly. A trigger that arrives while the body
//!    is running sets a pending flag; the body runs once more after it
//!    returns.
//! 2. Self-triggering is capped at [`MAX_RERUNS`] consecutive follow-up runs.
//! 3. After `dispose()` the body never runs again and is dropped as soon as
//!    it is not executing.
//!
//! # Failure Modes
//!
//! - **Body panics**: the observer stack and the running flag are restored by
//!   a drop guard, so later triggers still work.
//! - **Handle dropped**: the node is freed; observables holding weak
//!   references skip it and prune the entry on their next notification.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::batch;

/// Upper bound on consecutive self-triggered re-runs of one effect.
pub const MAX_RERUNS: u32 = 100;

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static OBSERVERS: RefCell<Vec<Rc<EffectNode>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) struct EffectNode {
    id: u64,
    body: RefCell<Option<Box<dyn FnMut()>>>,
    /// Incremented at the start of every run.
    epoch: Cell<u64>,
    running: Cell<bool>,
    pending: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
}

impl EffectNode {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// Clears the running flag and pops the observer stack, even on unwind.
struct RunGuard<'a> {
    node: &'a EffectNode,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        OBSERVERS.with(|stack| {
            stack.borrow_mut().pop();
        });
        self.node.running.set(false);
    }
}

/// Dependent effects recorded by one observable.
#[derive(Default)]
pub(crate) struct Dependents {
    entries: Vec<(Weak<EffectNode>, u64)>,
}

impl Dependents {
    /// Record the innermost running effect, if any, as a dependent.
    pub(crate) fn track(&mut self) {
        let Some(current) = OBSERVERS.with(|stack| stack.borrow().last().cloned()) else {
            return;
        };
        let epoch = current.epoch.get();
        for (weak, seen) in &mut self.entries {
            if weak.upgrade().is_some_and(|node| node.id == current.id) {
                *seen = epoch;
                return;
            }
        }
        self.entries.push((Rc::downgrade(&current), epoch));
    }

    /// Effects whose latest run read this observable. Dead and stale
    /// entries are pruned.
    pub(crate) fn live(&mut self) -> Vec<Rc<EffectNode>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|(weak, seen)| match weak.upgrade() {
            Some(node) if !node.disposed.get() && node.epoch.get() == *seen => {
                live.push(node);
                true
            }
            _ => false,
        });
        live
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle to a running effect. Dropping the handle disposes the effect.
#[must_use = "dropping an EffectHandle disposes the effect immediately"]
pub struct EffectHandle {
    node: Rc<EffectNode>,
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.node.id)
            .field("runs", &self.node.runs.get())
            .field("disposed", &self.node.disposed.get())
            .finish()
    }
}

impl EffectHandle {
    /// Stop the effect. Idempotent.
    pub fn dispose(&self) {
        if self.node.disposed.replace(true) {
            return;
        }
        tracing::trace!(effect_id = self.node.id, "effect disposed");
        if let Ok(mut body) = self.node.body.try_borrow_mut() {
            body.take();
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.node.disposed.get()
    }

    /// Total number of times the body has run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.node.runs.get()
    }

    /// Run the body now, outside of any dependency change.
    pub fn rerun(&self) {
        run(&self.node);
    }
}

impl Drop for EffectHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Create an effect: run `body` now and again whenever an observable it read
/// during its most recent run changes.
pub fn effect(body: impl FnMut() + 'static) -> EffectHandle {
    let node = Rc::new(EffectNode {
        id: NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed),
        body: RefCell::new(Some(Box::new(body))),
        epoch: Cell::new(0),
        running: Cell::new(false),
        pending: Cell::new(false),
        disposed: Cell::new(false),
        runs: Cell::new(0),
    });
    run(&node);
    EffectHandle { node }
}

/// Whether an effect body is currently executing on this thread.
#[must_use]
pub fn is_tracking() -> bool {
    OBSERVERS.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` without recording dependencies for the enclosing effect.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let saved = OBSERVERS.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    let out = f();
    OBSERVERS.with(|stack| *stack.borrow_mut() = saved);
    out
}

/// Run the given effects now, or hand them to the active batch.
pub(crate) fn schedule(nodes: Vec<Rc<EffectNode>>) {
    if nodes.is_empty() {
        return;
    }
    if batch::is_batching() {
        batch::defer(nodes);
    } else {
        for node in nodes {
            run(&node);
        }
    }
}

pub(crate) fn run(node: &Rc<EffectNode>) {
    if node.disposed.get() {
        return;
    }
    if node.running.get() {
        node.pending.set(true);
        return;
    }

    let mut reruns = 0u32;
    loop {
        node.running.set(true);
        node.epoch.set(node.epoch.get() + 1);
        node.runs.set(node.runs.get() + 1);
        OBSERVERS.with(|stack| stack.borrow_mut().push(Rc::clone(node)));
        {
            let _guard = RunGuard { node };
            let mut body = node.body.borrow_mut();
            if let Some(f) = body.as_mut() {
                f();
            }
        }

        if node.disposed.get() {
            node.body.borrow_mut().take();
            break;
        }
        if !node.pending.replace(false) {
            break;
        }
        reruns += 1;
        if reruns >= MAX_RERUNS {
            tracing::warn!(
                effect_id = node.id,
                reruns,
                "effect keeps re-triggering itself; dropping further re-runs"
            );
            break;
        }
    }
}

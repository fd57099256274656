#![forbid(unsafe_code)]

//! Deferred effect execution.
//!
//! While a [`BatchScope`] is alive, observable writes still update values
//! immediately, but the effects they trigger are queued. When the outermost
//! scope drops, the queue is flushed: each queued effect runs once, in the
//! order it was first queued. Effects triggered during the flush run
//! immediately (the batch is over).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::effect::{self, EffectNode};

#[derive(Default)]
struct BatchState {
    depth: u32,
    pending: Vec<Rc<EffectNode>>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// RAII guard that defers effect re-runs until the outermost scope exits.
///
/// Nested scopes are supported; only the outermost one flushes.
#[must_use = "the batch ends as soon as the scope is dropped"]
pub struct BatchScope {
    _not_send: PhantomData<Rc<()>>,
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &depth())
            .finish()
    }
}

impl BatchScope {
    /// Open a batch scope.
    pub fn new() -> Self {
        BATCH.with(|state| state.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether any batch scope is open on this thread.
    #[must_use]
    pub fn is_active() -> bool {
        is_batching()
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH.with(|state| {
            let mut state = state.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            state.depth == 0
        });
        if outermost {
            flush();
        }
    }
}

/// Run `f` inside a [`BatchScope`].
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}

pub(crate) fn is_batching() -> bool {
    depth() > 0
}

fn depth() -> u32 {
    BATCH.with(|state| state.borrow().depth)
}

pub(crate) fn defer(nodes: Vec<Rc<EffectNode>>) {
    BATCH.with(|state| {
        let mut state = state.borrow_mut();
        for node in nodes {
            if !state.pending.iter().any(|queued| queued.id() == node.id()) {
                state.pending.push(node);
            }
        }
    });
}

fn flush() {
    let pending = BATCH.with(|state| std::mem::take(&mut state.borrow_mut().pending));
    if pending.is_empty() {
        return;
    }
    tracing::trace!(effects = pending.len(), "flushing batched effects");
    for node in pending {
        effect::run(&node);
    }
}

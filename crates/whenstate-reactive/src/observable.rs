#![forbid(unsafe_code)]

//! Shared, version-tracked values.
//!
//! An [`Observable<T>`] is a cheaply clonable handle to a single value.
//! Reading it inside an [`effect`](crate::effect) body records a dependency;
//! writing a different value bumps the version, notifies subscribers in
//! registration order, and schedules dependent effects.
//!
//! # Failure Modes
//!
//! - **Subscriber writes back to the same observable**: allowed. Callbacks
//!   receive a snapshot of the new value and run with no borrow held.
//! - **Subscription outlives its observable**: dropping it is a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::effect::{self, Dependents};

type Callback<T> = Rc<dyn Fn(&T)>;

struct SubscriberEntry<T> {
    id: u64,
    callback: Callback<T>,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<SubscriberEntry<T>>,
    next_subscriber_id: u64,
    dependents: Dependents,
}

/// A shared value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
                dependents: Dependents::default(),
            })),
        }
    }

    /// Clone out the current value, recording a dependency for the running
    /// effect.
    #[must_use]
    pub fn get(&self) -> T {
        let mut inner = self.inner.borrow_mut();
        inner.dependents.track();
        inner.value.clone()
    }

    /// Clone out the current value without recording a dependency.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value, recording a dependency for the running
    /// effect.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.borrow_mut().dependents.track();
        let inner = self.inner.borrow();
        f(&inner.value)
    }

    /// Replace the value. Equal values are ignored.
    pub fn set(&self, value: T) {
        let notification = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            Self::collect(&mut inner)
        };
        Self::notify(notification);
    }

    /// Mutate the value in place. Notifies only if the result differs from
    /// the previous value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let notification = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.value.clone();
            f(&mut inner.value);
            if inner.value == before {
                return;
            }
            inner.version += 1;
            Self::collect(&mut inner)
        };
        Self::notify(notification);
    }

    /// Register a callback invoked with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;
            inner.subscribers.push(SubscriberEntry {
                id,
                callback: Rc::new(callback),
            });
            id
        };

        let weak: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(strong) = weak.upgrade() {
                    strong.borrow_mut().subscribers.retain(|s| s.id != id);
                }
            })),
        }
    }

    /// Number of changes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscriber callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Number of recorded effect dependents, including not-yet-pruned stale
    /// entries.
    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.borrow().dependents.len()
    }

    /// Whether two handles share the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn collect(inner: &mut ObservableInner<T>) -> Notification<T> {
        Notification {
            snapshot: inner.value.clone(),
            callbacks: inner
                .subscribers
                .iter()
                .map(|s| Rc::clone(&s.callback))
                .collect(),
            effects: inner.dependents.live(),
        }
    }

    fn notify(notification: Notification<T>) {
        for callback in &notification.callbacks {
            callback(&notification.snapshot);
        }
        effect::schedule(notification.effects);
    }
}

struct Notification<T> {
    snapshot: T,
    callbacks: Vec<Callback<T>>,
    effects: Vec<Rc<effect::EffectNode>>,
}

/// RAII guard for an [`Observable::subscribe`] callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

//! Bookkeeping for listeners attached through `addEventListener` configs.
//!
//! Records live in a side table keyed by element identity and hold only weak
//! element references, so an element dropped by the host takes its records
//! with it on the next prune.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::dom::{Callback, Element, ElementId, ListenerOptions, WeakElement};

/// One listener attached by the engine.
#[derive(Debug, Clone)]
pub struct ListenerRecord {
    pub event: String,
    pub callback: Callback,
    pub options: ListenerOptions,
}

#[derive(Debug)]
struct Slot {
    element: WeakElement,
    records: Vec<ListenerRecord>,
}

/// Per-element listener records.
#[derive(Debug, Default)]
pub struct ListenerRecords {
    slots: RefCell<FxHashMap<ElementId, Slot>>,
}

impl ListenerRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a listener the engine attached to `element`.
    pub fn record(&self, element: &Element, record: ListenerRecord) {
        self.prune();
        self.slots
            .borrow_mut()
            .entry(element.element_id())
            .or_insert_with(|| Slot {
                element: element.downgrade(),
                records: Vec::new(),
            })
            .records
            .push(record);
    }

    /// Detach every recorded listener from `element` and forget them.
    /// Returns how many were detached.
    pub fn clear(&self, element: &Element) -> usize {
        let Some(slot) = self.slots.borrow_mut().remove(&element.element_id()) else {
            return 0;
        };
        for record in &slot.records {
            element.remove_event_listener(&record.event, &record.callback, record.options.capture);
        }
        trace!(removed = slot.records.len(), "cleared recorded listeners");
        slot.records.len()
    }

    /// Drop the record for one listener that was removed directly.
    pub fn forget(&self, element: &Element, event: &str, callback: &Callback, capture: bool) {
        let mut slots = self.slots.borrow_mut();
        let id = element.element_id();
        let Some(slot) = slots.get_mut(&id) else {
            return;
        };
        slot.records.retain(|r| {
            !(r.event == event && r.callback.ptr_eq(callback) && r.options.capture == capture)
        });
        if slot.records.is_empty() {
            slots.remove(&id);
        }
    }

    #[must_use]
    pub fn records_for(&self, element: &Element) -> Vec<ListenerRecord> {
        self.slots
            .borrow()
            .get(&element.element_id())
            .map(|slot| slot.records.clone())
            .unwrap_or_default()
    }

    /// Total records across live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prune();
        self.slots.borrow().values().map(|s| s.records.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop slots whose element is gone. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|_, slot| slot.element.upgrade().is_some());
        before - slots.len()
    }
}

#![forbid(unsafe_code)]

//! In-memory element model.
//!
//! Provides the host surface the handlers and the target resolver need:
//! elements with attributes, class lists, inline style, dataset, native
//! properties and listeners, plus a flat [`Document`] supporting the three
//! lookups (`#id`, `.class`, selector query). There is no tree: a document
//! is an ordered list of attached elements.

mod element;
mod event;
mod selector;

use std::cell::RefCell;
use std::rc::Rc;

pub use element::{ClassList, Element, ElementId, UpdateHook, WeakElement};
pub use event::{Callback, Event, ListenerOptions};
pub use selector::Selector;

use crate::error::Result;

/// Ordered set of attached elements.
#[derive(Clone, Default)]
pub struct Document {
    elements: Rc<RefCell<Vec<Element>>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("elements", &self.elements.borrow().len())
            .finish()
    }
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element. Call [`Document::append`] to attach it.
    #[must_use]
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new(tag)
    }

    /// Attach `element` at the end. Attaching twice is a no-op.
    pub fn append(&self, element: &Element) {
        let mut elements = self.elements.borrow_mut();
        if !elements.contains(element) {
            elements.push(element.clone());
        }
    }

    /// Detach `element`. Returns whether it was attached.
    pub fn remove(&self, element: &Element) -> bool {
        let mut elements = self.elements.borrow_mut();
        let before = elements.len();
        elements.retain(|e| e != element);
        elements.len() != before
    }

    #[must_use]
    pub fn contains(&self, element: &Element) -> bool {
        self.elements.borrow().contains(element)
    }

    /// Attached elements in document order.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.elements.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        if id.is_empty() {
            return None;
        }
        self.elements
            .borrow()
            .iter()
            .find(|e| e.get_attribute("id").as_deref() == Some(id))
            .cloned()
    }

    /// Elements carrying every whitespace-separated class in `names`.
    #[must_use]
    pub fn get_elements_by_class_name(&self, names: &str) -> Vec<Element> {
        let wanted: Vec<&str> = names.split_whitespace().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.elements
            .borrow()
            .iter()
            .filter(|e| {
                let classes = e.class_list();
                wanted.iter().all(|c| classes.contains(c))
            })
            .cloned()
            .collect()
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements
            .borrow()
            .iter()
            .filter(|e| selector.matches(e))
            .cloned()
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .elements
            .borrow()
            .iter()
            .find(|e| selector.matches(e))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(specs: &[(&str, &str, &str)]) -> (Document, Vec<Element>) {
        let doc = Document::new();
        let elements = specs
            .iter()
            .map(|(tag, id, class)| {
                let el = doc.create_element(tag);
                if !id.is_empty() {
                    el.set_attribute("id", *id).expect("id");
                }
                el.set_class_name(*class);
                doc.append(&el);
                el
            })
            .collect();
        (doc, elements)
    }

    #[test]
    fn lookups_follow_document_order() {
        let (doc, els) = doc_with(&[
            ("div", "a", "item"),
            ("span", "", "item special"),
            ("div", "c", "other"),
        ]);
        assert_eq!(doc.get_element_by_id("c"), Some(els[2].clone()));
        assert_eq!(doc.get_element_by_id("zzz"), None);
        assert_eq!(doc.get_elements_by_class_name("item"), vec![els[0].clone(), els[1].clone()]);
        assert_eq!(doc.get_elements_by_class_name("special item"), vec![els[1].clone()]);
        assert_eq!(
            doc.query_selector_all("div").expect("selector"),
            vec![els[0].clone(), els[2].clone()]
        );
        assert_eq!(doc.query_selector("span.item").expect("selector"), Some(els[1].clone()));
    }

    #[test]
    fn detached_elements_are_invisible() {
        let (doc, els) = doc_with(&[("div", "x", "")]);
        assert!(doc.remove(&els[0]));
        assert!(!doc.remove(&els[0]));
        assert!(doc.get_element_by_id("x").is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn append_is_idempotent() {
        let doc = Document::new();
        let el = doc.create_element("p");
        doc.append(&el);
        doc.append(&el);
        assert_eq!(doc.len(), 1);
    }
}

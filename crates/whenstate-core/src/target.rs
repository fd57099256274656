#![forbid(unsafe_code)]

//! Target resolution.
//!
//! A [`Target`] names what a binding writes to. Resolution happens on every
//! cycle, so selector targets see elements attached after the binding was
//! created.
//!
//! | form | lookup |
//! |------|--------|
//! | element | itself |
//! | vector / collection | every element, in order |
//! | `#id` | cache `by_id`, else `get_element_by_id` |
//! | `.class` | cache `by_class`, else `get_elements_by_class_name` |
//! | other string | cache `query`, else `query_selector_all` |

use std::rc::Rc;

use tracing::warn;

use crate::dom::{Document, Element};

/// Indexed element collection (`len` + `item`).
pub trait ElementCollection {
    fn len(&self) -> usize;

    fn item(&self, index: usize) -> Option<Element>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ElementCollection for Vec<Element> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn item(&self, index: usize) -> Option<Element> {
        self.get(index).cloned()
    }
}

impl ElementCollection for Document {
    fn len(&self) -> usize {
        Document::len(self)
    }

    fn item(&self, index: usize) -> Option<Element> {
        self.elements().get(index).cloned()
    }
}

/// Optional lookup layer consulted before the document. Every method
/// defaults to "not cached".
pub trait ElementCache {
    fn by_id(&self, _id: &str) -> Option<Element> {
        None
    }

    fn by_class(&self, _name: &str) -> Option<Vec<Element>> {
        None
    }

    fn query(&self, _selector: &str) -> Option<Vec<Element>> {
        None
    }
}

/// What a binding applies configs to.
#[derive(Clone)]
pub enum Target {
    Element(Element),
    Elements(Vec<Element>),
    Collection(Rc<dyn ElementCollection>),
    Selector(String),
}

impl Target {
    pub fn collection(collection: impl ElementCollection + 'static) -> Self {
        Self::Collection(Rc::new(collection))
    }

    /// Short label for log fields.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Element(el) => format!("<{}>", el.tag()),
            Self::Elements(els) => format!("[{} elements]", els.len()),
            Self::Collection(c) => format!("collection({})", c.len()),
            Self::Selector(s) => s.clone(),
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element(el) => f.debug_tuple("Element").field(el).finish(),
            Self::Elements(els) => f.debug_tuple("Elements").field(els).finish(),
            Self::Collection(c) => f.debug_tuple("Collection").field(&c.len()).finish(),
            Self::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
        }
    }
}

impl From<Element> for Target {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

impl From<&Element> for Target {
    fn from(el: &Element) -> Self {
        Self::Element(el.clone())
    }
}

impl From<Vec<Element>> for Target {
    fn from(els: Vec<Element>) -> Self {
        Self::Elements(els)
    }
}

impl From<&[Element]> for Target {
    fn from(els: &[Element]) -> Self {
        Self::Elements(els.to_vec())
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

/// Turns targets into element lists.
#[derive(Clone)]
pub struct TargetResolver {
    document: Document,
    cache: Option<Rc<dyn ElementCache>>,
}

impl std::fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetResolver")
            .field("document", &self.document)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl TargetResolver {
    #[must_use]
    pub fn new(document: Document, cache: Option<Rc<dyn ElementCache>>) -> Self {
        Self { document, cache }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Resolve `target`. An empty result has already been logged.
    #[must_use]
    pub fn resolve(&self, target: &Target) -> Vec<Element> {
        let elements = match target {
            Target::Element(el) => vec![el.clone()],
            Target::Elements(els) => els.clone(),
            Target::Collection(collection) => (0..collection.len())
                .filter_map(|i| collection.item(i))
                .collect(),
            Target::Selector(selector) => self.lookup(selector),
        };
        if elements.is_empty() {
            warn!(selector = %target.describe(), "target resolved to no elements");
        }
        elements
    }

    fn lookup(&self, selector: &str) -> Vec<Element> {
        let cache = self.cache.as_deref();
        if let Some(id) = selector.strip_prefix('#') {
            return cache
                .and_then(|c| c.by_id(id))
                .or_else(|| self.document.get_element_by_id(id))
                .into_iter()
                .collect();
        }
        if let Some(class) = selector.strip_prefix('.') {
            return cache
                .and_then(|c| c.by_class(class))
                .unwrap_or_else(|| self.document.get_elements_by_class_name(class));
        }
        if let Some(found) = cache.and_then(|c| c.query(selector)) {
            return found;
        }
        self.document
            .query_selector_all(selector)
            .unwrap_or_else(|err| {
                warn!(selector, error = %err, "selector query failed");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingCache {
        hit: Element,
        calls: Cell<usize>,
    }

    impl ElementCache for CountingCache {
        fn by_id(&self, id: &str) -> Option<Element> {
            self.calls.set(self.calls.get() + 1);
            (id == "cached").then(|| self.hit.clone())
        }
    }

    fn document() -> (Document, Element, Element) {
        let doc = Document::new();
        let a = doc.create_element("div");
        a.set_attribute("id", "a").expect("id");
        a.set_class_name("item");
        let b = doc.create_element("p");
        b.set_class_name("item");
        doc.append(&a);
        doc.append(&b);
        (doc, a, b)
    }

    #[test]
    fn string_forms() {
        let (doc, a, b) = document();
        let resolver = TargetResolver::new(doc, None);
        assert_eq!(resolver.resolve(&"#a".into()), vec![a.clone()]);
        assert_eq!(resolver.resolve(&".item".into()), vec![a.clone(), b.clone()]);
        assert_eq!(resolver.resolve(&"p.item".into()), vec![b]);
        assert!(resolver.resolve(&"#missing".into()).is_empty());
        assert!(resolver.resolve(&"div > p".into()).is_empty());
    }

    #[test]
    fn collections_walk_by_index() {
        let (doc, a, b) = document();
        let resolver = TargetResolver::new(doc.clone(), None);
        assert_eq!(
            resolver.resolve(&Target::collection(doc)),
            vec![a.clone(), b.clone()]
        );
        assert_eq!(resolver.resolve(&Target::from(vec![b.clone(), a.clone()])), vec![b, a]);
    }

    #[test]
    fn cache_is_preferred_then_document() {
        let (doc, a, _) = document();
        let detached = Element::new("span");
        let cache = Rc::new(CountingCache {
            hit: detached.clone(),
            calls: Cell::new(0),
        });
        let shared: Rc<dyn ElementCache> = cache.clone();
        let resolver = TargetResolver::new(doc, Some(shared));
        assert_eq!(resolver.resolve(&"#cached".into()), vec![detached]);
        assert_eq!(resolver.resolve(&"#a".into()), vec![a]);
        assert_eq!(cache.calls.get(), 2);
    }
}

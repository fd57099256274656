//! Element handles.
//!
//! An [`Element`] is a shared handle (`Rc`) to one node's mutable state:
//! attributes, inline style, native properties and listeners. The `class`
//! and `id` attributes back the `className`/`id` properties and the class
//! list; `data-*` attributes back the dataset, mirroring the host.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::config::Config;
use crate::dom::event::{Callback, Event, ListenerOptions, RegisteredListener};
use crate::error::{Error, Result};
use crate::value::Value;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Element-level fast path: receives the whole config at once.
pub type UpdateHook = Rc<dyn Fn(&Element, &Config) -> Result<()>>;

/// Stable identity of an element for side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

const TEXT_PROPERTIES: &[&str] = &[
    "textContent",
    "innerText",
    "innerHTML",
    "value",
    "title",
    "placeholder",
    "src",
    "href",
    "alt",
    "name",
    "type",
    "lang",
    "dir",
];

const FLAG_PROPERTIES: &[&str] = &[
    "checked", "disabled", "hidden", "selected", "readOnly", "required", "multiple",
];

const READ_ONLY_PROPERTIES: &[&str] = &[
    "tagName",
    "nodeName",
    "attributes",
    "children",
    "parentNode",
    "classList",
    "style",
    "dataset",
];

const EVENT_HANDLER_PROPERTIES: &[&str] = &[
    "onclick",
    "ondblclick",
    "oninput",
    "onchange",
    "onsubmit",
    "onkeydown",
    "onkeyup",
    "onkeypress",
    "onfocus",
    "onblur",
    "onmousedown",
    "onmouseup",
    "onmouseover",
    "onmouseout",
    "onmouseenter",
    "onmouseleave",
    "onscroll",
    "onload",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Id,
    ClassName,
    Text,
    Flag,
    TabIndex,
    ReadOnly,
    EventHandler,
}

fn property_kind(key: &str) -> Option<PropertyKind> {
    match key {
        "id" => Some(PropertyKind::Id),
        "className" => Some(PropertyKind::ClassName),
        "tabIndex" => Some(PropertyKind::TabIndex),
        _ if TEXT_PROPERTIES.contains(&key) => Some(PropertyKind::Text),
        _ if FLAG_PROPERTIES.contains(&key) => Some(PropertyKind::Flag),
        _ if READ_ONLY_PROPERTIES.contains(&key) => Some(PropertyKind::ReadOnly),
        _ if EVENT_HANDLER_PROPERTIES.contains(&key) => Some(PropertyKind::EventHandler),
        _ => None,
    }
}

/// `innerText` shares storage with `textContent`.
fn storage_key(key: &str) -> &str {
    if key == "innerText" { "textContent" } else { key }
}

#[derive(Default)]
struct ElementState {
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
    listeners: Vec<RegisteredListener>,
}

struct ElementNode {
    id: ElementId,
    tag: String,
    state: RefCell<ElementState>,
    update_hook: RefCell<Option<UpdateHook>>,
}

/// Shared handle to one element.
#[derive(Clone)]
pub struct Element {
    node: Rc<ElementNode>,
}

/// Non-owning element reference.
#[derive(Clone)]
pub struct WeakElement {
    id: ElementId,
    node: Weak<ElementNode>,
}

impl WeakElement {
    #[must_use]
    pub fn upgrade(&self) -> Option<Element> {
        self.node.upgrade().map(|node| Element { node })
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }
}

impl std::fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakElement")
            .field("id", &self.id)
            .field("alive", &(self.node.strong_count() > 0))
            .finish()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id.hash(state);
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.node.state.borrow();
        f.debug_struct("Element")
            .field("tag", &self.node.tag)
            .field("id", &self.node.id.0)
            .field("attributes", &state.attributes)
            .finish_non_exhaustive()
    }
}

impl Element {
    /// Create a detached element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(ElementNode {
                id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
                tag: tag.into().to_ascii_lowercase(),
                state: RefCell::new(ElementState::default()),
                update_hook: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn element_id(&self) -> ElementId {
        self.node.id
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            id: self.node.id,
            node: Rc::downgrade(&self.node),
        }
    }

    /// Lower-case tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    // ── Attributes ──────────────────────────────────────────────────────

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.node.state.borrow().attributes.get(name).cloned()
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.node.state.borrow().attributes.contains_key(name)
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<String>) -> Result<()> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '=' || c == '"') {
            return Err(Error::apply(name, "invalid attribute name"));
        }
        self.node
            .state
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn remove_attribute(&self, name: &str) {
        self.node.state.borrow_mut().attributes.shift_remove(name);
    }

    /// Attribute names in insertion order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.node.state.borrow().attributes.keys().cloned().collect()
    }

    // ── id / class ──────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> String {
        self.get_attribute("id").unwrap_or_default()
    }

    #[must_use]
    pub fn class_name(&self) -> String {
        self.get_attribute("class").unwrap_or_default()
    }

    pub fn set_class_name(&self, value: impl Into<String>) {
        self.node
            .state
            .borrow_mut()
            .attributes
            .insert("class".to_string(), value.into());
    }

    #[must_use]
    pub fn class_list(&self) -> ClassList<'_> {
        ClassList { element: self }
    }

    // ── Inline style ────────────────────────────────────────────────────

    #[must_use]
    pub fn style(&self, property: &str) -> Option<String> {
        self.node.state.borrow().style.get(property).cloned()
    }

    /// Set one inline style property. An empty value removes it.
    pub fn set_style(&self, property: &str, value: impl Into<String>) {
        let value = value.into();
        let mut state = self.node.state.borrow_mut();
        if value.is_empty() {
            state.style.shift_remove(property);
        } else {
            state.style.insert(property.to_string(), value);
        }
    }

    #[must_use]
    pub fn style_entries(&self) -> Vec<(String, String)> {
        self.node
            .state
            .borrow()
            .style
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ── Dataset ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn data(&self, name: &str) -> Option<String> {
        self.get_attribute(&dataset_attribute(name).ok()?)
    }

    /// Set `dataset[name]`, stored as the matching `data-*` attribute.
    pub fn set_data(&self, name: &str, value: impl Into<String>) -> Result<()> {
        let attribute = dataset_attribute(name)?;
        self.set_attribute(&attribute, value)
    }

    /// Dataset entries with camel-cased names, in attribute order.
    #[must_use]
    pub fn dataset(&self) -> Vec<(String, String)> {
        self.node
            .state
            .borrow()
            .attributes
            .iter()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix("data-")?;
                Some((camel_case(rest), value.clone()))
            })
            .collect()
    }

    // ── Native properties ───────────────────────────────────────────────

    /// Whether `key` names a property of this element (`key in element`).
    #[must_use]
    pub fn has_property(&self, key: &str) -> bool {
        property_kind(key).is_some() || self.node.state.borrow().properties.contains_key(key)
    }

    /// Read a property. Unknown properties read as `undefined`.
    #[must_use]
    pub fn property(&self, key: &str) -> Value {
        match property_kind(key) {
            Some(PropertyKind::Id) => Value::String(self.id()),
            Some(PropertyKind::ClassName) => Value::String(self.class_name()),
            Some(PropertyKind::ReadOnly) if key == "tagName" || key == "nodeName" => {
                Value::String(self.node.tag.to_ascii_uppercase())
            }
            Some(kind) => {
                let state = self.node.state.borrow();
                state
                    .properties
                    .get(storage_key(key))
                    .cloned()
                    .unwrap_or(match kind {
                        PropertyKind::Text => Value::String(String::new()),
                        PropertyKind::Flag => Value::Bool(false),
                        PropertyKind::TabIndex => Value::Number(-1.0),
                        PropertyKind::EventHandler => Value::Null,
                        _ => Value::Undefined,
                    })
            }
            None => self
                .node
                .state
                .borrow()
                .properties
                .get(key)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Assign a property with the host's coercion for known properties.
    /// Unknown keys become expando properties holding the value as-is.
    pub fn set_property(&self, key: &str, value: Value) -> Result<()> {
        let stored = match property_kind(key) {
            Some(PropertyKind::Id) => return self.set_attribute("id", value.to_js_string()),
            Some(PropertyKind::ClassName) => {
                self.set_class_name(value.to_js_string());
                return Ok(());
            }
            Some(PropertyKind::ReadOnly) => {
                return Err(Error::apply(key, "property is read-only"));
            }
            Some(PropertyKind::Text) => {
                if value.is_nullish() {
                    Value::String(String::new())
                } else {
                    Value::String(value.to_js_string())
                }
            }
            Some(PropertyKind::Flag) => Value::Bool(value.is_truthy()),
            Some(PropertyKind::TabIndex) => {
                let n = match &value {
                    Value::Number(n) => *n,
                    other => other.to_js_string().trim().parse::<f64>().unwrap_or(0.0),
                };
                Value::Number(if n.is_finite() { n.trunc() } else { 0.0 })
            }
            Some(PropertyKind::EventHandler) => match value {
                Value::Function(_) => value,
                _ => Value::Null,
            },
            None => value,
        };
        self.node
            .state
            .borrow_mut()
            .properties
            .insert(storage_key(key).to_string(), stored);
        Ok(())
    }

    /// `textContent` as a string.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.property("textContent").to_js_string()
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Attach a listener. Attaching the same (type, callback, capture)
    /// twice is a no-op.
    pub fn add_event_listener(&self, kind: &str, callback: Callback, options: ListenerOptions) {
        let mut state = self.node.state.borrow_mut();
        if state
            .listeners
            .iter()
            .any(|l| l.is(kind, &callback, options.capture))
        {
            return;
        }
        state.listeners.push(RegisteredListener {
            kind: kind.to_string(),
            callback,
            options,
        });
    }

    /// Detach a listener. Returns whether one was removed.
    pub fn remove_event_listener(&self, kind: &str, callback: &Callback, capture: bool) -> bool {
        let mut state = self.node.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|l| !l.is(kind, callback, capture));
        state.listeners.len() != before
    }

    /// Number of attached listeners for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: &str) -> usize {
        self.node
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Number of attached listeners of any type.
    #[must_use]
    pub fn total_listener_count(&self) -> usize {
        self.node.state.borrow().listeners.len()
    }

    /// Fire an event at this element: listeners in attachment order, then
    /// the `on<kind>` property. Returns the number of callbacks invoked.
    pub fn dispatch_event(&self, kind: &str) -> usize {
        let listeners: Vec<RegisteredListener> = {
            let mut state = self.node.state.borrow_mut();
            let matching: Vec<_> = state
                .listeners
                .iter()
                .filter(|l| l.kind == kind)
                .cloned()
                .collect();
            state.listeners.retain(|l| !(l.kind == kind && l.options.once));
            matching
        };
        let handler = self.property(&format!("on{kind}"));

        let event = Event {
            kind: kind.to_string(),
            target: self.clone(),
        };
        for listener in &listeners {
            listener.callback.call(&event);
        }
        let mut invoked = listeners.len();
        if let Value::Function(callback) = handler {
            callback.call(&event);
            invoked += 1;
        }
        invoked
    }

    // ── Update hook ─────────────────────────────────────────────────────

    /// Install an `update(config)` fast path for this element.
    pub fn set_update_hook(&self, hook: impl Fn(&Element, &Config) -> Result<()> + 'static) {
        *self.node.update_hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn clear_update_hook(&self) {
        self.node.update_hook.borrow_mut().take();
    }

    #[must_use]
    pub fn update_hook(&self) -> Option<UpdateHook> {
        self.node.update_hook.borrow().clone()
    }
}

/// View over the `class` attribute as an ordered token set.
pub struct ClassList<'a> {
    element: &'a Element,
}

impl std::fmt::Debug for ClassList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tokens()).finish()
    }
}

impl ClassList<'_> {
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.element
            .class_name()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| t == token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&self, token: &str) -> Result<()> {
        validate_token(token)?;
        let mut tokens = self.tokens();
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
        self.write(&tokens);
        Ok(())
    }

    pub fn remove(&self, token: &str) -> Result<()> {
        validate_token(token)?;
        let mut tokens = self.tokens();
        tokens.retain(|t| t != token);
        self.write(&tokens);
        Ok(())
    }

    /// Returns whether the token is present afterwards.
    pub fn toggle(&self, token: &str) -> Result<bool> {
        validate_token(token)?;
        if self.contains(token) {
            self.remove(token)?;
            Ok(false)
        } else {
            self.add(token)?;
            Ok(true)
        }
    }

    /// Replace `old` with `new` in place. Returns whether `old` was present.
    pub fn replace(&self, old: &str, new: &str) -> Result<bool> {
        validate_token(old)?;
        validate_token(new)?;
        let tokens = self.tokens();
        if !tokens.iter().any(|t| t == old) {
            return Ok(false);
        }
        let mut out: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token = if token == old { new.to_string() } else { token };
            if !out.contains(&token) {
                out.push(token);
            }
        }
        self.write(&out);
        Ok(true)
    }

    fn write(&self, tokens: &[String]) {
        self.element.set_class_name(tokens.join(" "));
    }
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::apply("classList", "class token must not be empty"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(Error::apply(
            "classList",
            format!("class token {token:?} contains whitespace"),
        ));
    }
    Ok(())
}

/// `fooBar` → `data-foo-bar`. Names with `-` followed by a lower-case
/// letter are rejected like the host does.
fn dataset_attribute(name: &str) -> Result<String> {
    let bytes = name.as_bytes();
    if bytes
        .windows(2)
        .any(|w| w[0] == b'-' && w[1].is_ascii_lowercase())
    {
        return Err(Error::apply("dataset", format!("invalid dataset name {name:?}")));
    }
    let mut out = String::from("data-");
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// `foo-bar` → `fooBar`.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            if upper {
                out.push('-');
            }
            out.push(c);
            upper = false;
        }
    }
    if upper {
        out.push('-');
    }
    out
}

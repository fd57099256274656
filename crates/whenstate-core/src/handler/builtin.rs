use std::rc::Rc;

use super::Handler;
use super::listeners::{ListenerRecord, ListenerRecords};
use crate::dom::{Callback, Element, ListenerOptions};
use crate::error::{Error, Result};
use crate::value::Value;

/// Operands given as an array or a single scalar.
fn operands(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(Value::to_js_string).collect(),
        other => vec![other.to_js_string()],
    }
}

/// `style: { prop: value }`. Nullish entries are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleHandler;

impl Handler for StyleHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "style" && matches!(value, Value::Object(_))
    }

    fn apply(&self, element: &Element, value: &Value, _key: &str) -> Result<()> {
        if let Value::Object(entries) = value {
            for (property, v) in entries {
                if !v.is_nullish() {
                    element.set_style(property, v.to_js_string());
                }
            }
        }
        Ok(())
    }
}

/// `classList: [..]` replaces the class name with the truthy entries;
/// `classList: { add, remove, toggle, replace }` edits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassListHandler;

impl Handler for ClassListHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "classList" && matches!(value, Value::Array(_) | Value::Object(_))
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        match value {
            Value::Array(items) => {
                let names: Vec<String> = items
                    .iter()
                    .filter(|item| item.is_truthy())
                    .map(Value::to_js_string)
                    .collect();
                element.set_class_name(names.join(" "));
                Ok(())
            }
            Value::Object(ops) => {
                let classes = element.class_list();
                if let Some(add) = ops.get("add") {
                    for token in operands(add) {
                        classes.add(&token)?;
                    }
                }
                if let Some(remove) = ops.get("remove") {
                    for token in operands(remove) {
                        classes.remove(&token)?;
                    }
                }
                if let Some(toggle) = ops.get("toggle") {
                    for token in operands(toggle) {
                        classes.toggle(&token)?;
                    }
                }
                if let Some(replace) = ops.get("replace") {
                    match replace.as_array() {
                        Some([old, new]) => {
                            classes.replace(&old.to_js_string(), &new.to_js_string())?;
                        }
                        _ => {
                            return Err(Error::apply(key, "replace takes exactly two class names"));
                        }
                    }
                }
                Ok(())
            }
            other => Err(Error::apply(
                key,
                format!("expected array or object, got {}", other.type_name()),
            )),
        }
    }
}

/// `attrs` / `setAttribute: { name: value }`. `null`, `undefined` and `false`
/// remove the attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributesHandler;

impl Handler for AttributesHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        matches!(key, "attrs" | "setAttribute") && matches!(value, Value::Object(_))
    }

    fn apply(&self, element: &Element, value: &Value, _key: &str) -> Result<()> {
        if let Value::Object(entries) = value {
            for (name, v) in entries {
                if v.is_nullish() || *v == Value::Bool(false) {
                    element.remove_attribute(name);
                } else {
                    element.set_attribute(name, v.to_js_string())?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveAttributeHandler;

impl Handler for RemoveAttributeHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "removeAttribute" && matches!(value, Value::Array(_) | Value::String(_))
    }

    fn apply(&self, element: &Element, value: &Value, _key: &str) -> Result<()> {
        for name in operands(value) {
            element.remove_attribute(&name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetHandler;

impl Handler for DatasetHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "dataset" && matches!(value, Value::Object(_))
    }

    fn apply(&self, element: &Element, value: &Value, _key: &str) -> Result<()> {
        if let Value::Object(entries) = value {
            for (name, v) in entries {
                element.set_data(name, v.to_js_string())?;
            }
        }
        Ok(())
    }
}

/// `addEventListener: { event: fn }` or `{ event: { handler, options } }`.
///
/// Every listener previously recorded for the element is detached first, so
/// re-running a binding never stacks listeners.
#[derive(Debug, Clone)]
pub struct AddListenerHandler {
    records: Rc<ListenerRecords>,
}

impl AddListenerHandler {
    #[must_use]
    pub fn new(records: Rc<ListenerRecords>) -> Self {
        Self { records }
    }
}

fn listener_spec(event: &str, spec: &Value) -> Result<(Callback, ListenerOptions)> {
    match spec {
        Value::Function(callback) => Ok((callback.clone(), ListenerOptions::default())),
        Value::Object(map) => match map.get("handler") {
            Some(Value::Function(callback)) => Ok((
                callback.clone(),
                map.get("options")
                    .map(ListenerOptions::from_value)
                    .unwrap_or_default(),
            )),
            _ => Err(Error::apply(
                "addEventListener",
                format!("listener for {event:?} has no handler function"),
            )),
        },
        other => Err(Error::apply(
            "addEventListener",
            format!("listener for {event:?} must be a function, got {}", other.type_name()),
        )),
    }
}

impl Handler for AddListenerHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "addEventListener" && matches!(value, Value::Object(_))
    }

    fn apply(&self, element: &Element, value: &Value, _key: &str) -> Result<()> {
        let Value::Object(entries) = value else {
            return Ok(());
        };
        let listeners = entries
            .iter()
            .map(|(event, spec)| listener_spec(event, spec).map(|parsed| (event, parsed)))
            .collect::<Result<Vec<_>>>()?;

        self.records.clear(element);
        for (event, (callback, options)) in listeners {
            element.add_event_listener(event, callback.clone(), options);
            self.records.record(
                element,
                ListenerRecord {
                    event: event.clone(),
                    callback,
                    options,
                },
            );
        }
        Ok(())
    }
}

/// `removeEventListener: [event, fn, options?]`.
#[derive(Debug, Clone)]
pub struct RemoveListenerHandler {
    records: Rc<ListenerRecords>,
}

impl RemoveListenerHandler {
    #[must_use]
    pub fn new(records: Rc<ListenerRecords>) -> Self {
        Self { records }
    }
}

impl Handler for RemoveListenerHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key == "removeEventListener" && matches!(value, Value::Array(items) if items.len() >= 2)
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        let Some([event, handler, rest @ ..]) = value.as_array() else {
            return Err(Error::apply(key, "expected [event, handler, options?]"));
        };
        let Value::Function(callback) = handler else {
            return Err(Error::apply(key, "handler must be a function"));
        };
        let event = event.to_js_string();
        let capture = rest
            .first()
            .map(ListenerOptions::from_value)
            .unwrap_or_default()
            .capture;
        element.remove_event_listener(&event, callback, capture);
        self.records.forget(element, &event, callback, capture);
        Ok(())
    }
}

/// `onclick: fn` and friends: event-property assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventPropertyHandler;

impl Handler for EventPropertyHandler {
    fn test(&self, key: &str, value: &Value, _element: &Element) -> bool {
        key.len() > 2 && key.starts_with("on") && matches!(value, Value::Function(_))
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        element.set_property(key, value.clone())
    }
}

/// Assign any property the element already has.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyHandler;

impl Handler for PropertyHandler {
    fn test(&self, key: &str, _value: &Value, element: &Element) -> bool {
        element.has_property(key)
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        element.set_property(key, value.clone())
    }
}

/// Primitives become attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeFallbackHandler;

impl Handler for AttributeFallbackHandler {
    fn test(&self, _key: &str, value: &Value, _element: &Element) -> bool {
        value.is_primitive()
    }

    fn apply(&self, element: &Element, value: &Value, key: &str) -> Result<()> {
        element.set_attribute(key, value.to_js_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerTable;
    use serde_json::json;
    use std::cell::Cell;

    fn apply(table: &HandlerTable, el: &Element, key: &str, value: serde_json::Value) {
        table
            .apply_property(el, key, &Value::from(value))
            .expect("handler applies");
    }

    fn table() -> (HandlerTable, Rc<ListenerRecords>) {
        let records = Rc::new(ListenerRecords::new());
        (HandlerTable::builtin(Rc::clone(&records)), records)
    }

    #[test]
    fn style_skips_nullish() {
        let (table, _) = table();
        let el = Element::new("div");
        el.set_style("margin", "1px");
        apply(&table, &el, "style", json!({"color": "red", "margin": null, "width": 10}));
        assert_eq!(el.style("color").as_deref(), Some("red"));
        assert_eq!(el.style("margin").as_deref(), Some("1px"));
        assert_eq!(el.style("width").as_deref(), Some("10"));
    }

    #[test]
    fn class_list_array_replaces() {
        let (table, _) = table();
        let el = Element::new("div");
        el.set_class_name("old");
        apply(&table, &el, "classList", json!(["a", "", null, "b", false]));
        assert_eq!(el.class_name(), "a b");
    }

    #[test]
    fn class_list_object_operations() {
        let (table, _) = table();
        let el = Element::new("div");
        el.set_class_name("x y");
        apply(
            &table,
            &el,
            "classList",
            json!({"add": ["a", "b"], "remove": "x", "toggle": "y", "replace": ["a", "c"]}),
        );
        assert_eq!(el.class_name(), "c b");
    }

    #[test]
    fn class_list_replace_arity_is_checked() {
        let (table, _) = table();
        let el = Element::new("div");
        let err = table
            .apply_property(&el, "classList", &Value::from(json!({"replace": ["a"]})))
            .unwrap_err();
        assert!(matches!(err, Error::Apply { .. }));
    }

    #[test]
    fn attrs_set_and_remove() {
        let (table, _) = table();
        let el = Element::new("a");
        el.set_attribute("rel", "x").expect("attr");
        el.set_attribute("target", "y").expect("attr");
        apply(
            &table,
            &el,
            "attrs",
            json!({"href": "/", "rel": null, "target": false, "download": true}),
        );
        assert_eq!(el.get_attribute("href").as_deref(), Some("/"));
        assert_eq!(el.get_attribute("download").as_deref(), Some("true"));
        assert!(!el.has_attribute("rel"));
        assert!(!el.has_attribute("target"));
        apply(&table, &el, "setAttribute", json!({"role": "link"}));
        assert_eq!(el.get_attribute("role").as_deref(), Some("link"));
        apply(&table, &el, "removeAttribute", json!(["href", "role"]));
        apply(&table, &el, "removeAttribute", json!("download"));
        assert!(el.attribute_names().is_empty());
    }

    #[test]
    fn dataset_coerces_to_string() {
        let (table, _) = table();
        let el = Element::new("div");
        apply(&table, &el, "dataset", json!({"count": 3, "userName": "ann"}));
        assert_eq!(el.data("count").as_deref(), Some("3"));
        assert_eq!(el.get_attribute("data-user-name").as_deref(), Some("ann"));
    }

    #[test]
    fn add_listener_replaces_previous_records() {
        let (table, records) = table();
        let el = Element::new("button");
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let h = Rc::clone(&hits);
            let config = Value::object([
                ("click", Value::function(move |_| h.set(h.get() + 1))),
                (
                    "focus",
                    Value::object([
                        ("handler", Value::function(|_| {})),
                        ("options", Value::from(json!({"once": true}))),
                    ]),
                ),
            ]);
            table
                .apply_property(&el, "addEventListener", &config)
                .expect("listeners attach");
        }
        assert_eq!(el.listener_count("click"), 1);
        assert_eq!(el.listener_count("focus"), 1);
        assert_eq!(records.records_for(&el).len(), 2);
        el.dispatch_event("click");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn invalid_listener_spec_changes_nothing() {
        let (table, records) = table();
        let el = Element::new("button");
        let config = Value::object([("click", Value::from(5))]);
        assert!(table.apply_property(&el, "addEventListener", &config).is_err());
        assert_eq!(el.total_listener_count(), 0);
        assert!(records.is_empty());
    }

    #[test]
    fn remove_listener_detaches_and_forgets() {
        let (table, records) = table();
        let el = Element::new("button");
        let cb = Callback::new(|_| {});
        table
            .apply_property(
                &el,
                "addEventListener",
                &Value::object([("click", Value::Function(cb.clone()))]),
            )
            .expect("attach");
        table
            .apply_property(
                &el,
                "removeEventListener",
                &Value::Array(vec![Value::from("click"), Value::Function(cb)]),
            )
            .expect("detach");
        assert_eq!(el.listener_count("click"), 0);
        assert!(records.is_empty());
    }

    #[test]
    fn event_property_and_native_property() {
        let (table, _) = table();
        let el = Element::new("button");
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        table
            .apply_property(&el, "onclick", &Value::function(move |_| h.set(h.get() + 1)))
            .expect("event property");
        el.dispatch_event("click");
        assert_eq!(hits.get(), 1);

        apply(&table, &el, "textContent", json!("Save"));
        apply(&table, &el, "disabled", json!(true));
        assert_eq!(el.text_content(), "Save");
        assert_eq!(el.property("disabled"), Value::from(true));
        assert!(!el.has_attribute("textContent"));
    }

    #[test]
    fn read_only_property_is_an_apply_error() {
        let (table, _) = table();
        let el = Element::new("div");
        assert!(table.apply_property(&el, "tagName", &Value::from("p")).is_err());
    }
}

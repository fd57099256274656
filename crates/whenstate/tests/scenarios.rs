//! End-to-end scenarios over the in-memory document.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use whenstate::{
    BindingOptions, ConditionSet, ConditionsEngine, CycleOutcome, Document, Element, ElementCache,
    EngineOptions, FnHandler, FnMatcher, Value, ValueSource,
};

fn conditions(json: serde_json::Value) -> ConditionSet {
    ConditionSet::from_json(json).expect("valid condition set")
}

fn attach(document: &Document, tag: &str, id: Option<&str>, class: &str) -> Element {
    let el = document.create_element(tag);
    if let Some(id) = id {
        el.set_attribute("id", id).expect("id attribute");
    }
    el.set_class_name(class);
    document.append(&el);
    el
}

#[test]
fn range_conditions_pick_high_for_five() {
    let document = Document::new();
    let out = attach(&document, "output", Some("out"), "");
    let engine = whenstate::engine(document);

    let binding = engine.when_state(
        ValueSource::getter(|| Value::from(5)),
        conditions(json!({
            "1-3": {"textContent": "low"},
            "4-10": {"textContent": "high"},
            "default": {"textContent": "other"},
        })),
        "#out",
        BindingOptions::default(),
    );

    assert_eq!(out.text_content(), "high");
    assert_eq!(
        binding.last_outcome(),
        Some(CycleOutcome::Applied {
            condition: "4-10".into(),
            elements: 1
        })
    );
}

#[test]
fn includes_condition_sees_stringified_array() {
    let document = Document::new();
    let items = vec![
        attach(&document, "li", None, "item"),
        attach(&document, "li", None, "item"),
    ];
    let engine = ConditionsEngine::new(document);

    engine.apply(
        vec!["x"],
        conditions(json!({"includes:x": {"classList": {"add": ["found"]}}})),
        items.clone(),
    );

    for item in &items {
        assert!(item.class_list().contains("found"));
        assert!(item.class_list().contains("item"));
    }
}

#[test]
fn collection_dispatch_shared_and_indexed() {
    let document = Document::new();
    let els: Vec<Element> = (0..3).map(|_| attach(&document, "li", None, "row")).collect();
    let engine = ConditionsEngine::new(document);

    engine.apply(
        true,
        conditions(json!({
            "true": {
                "style": {"color": "red"},
                "0": {"textContent": "first"},
                "-1": {"textContent": "last"},
            }
        })),
        ".row",
    );

    for el in &els {
        assert_eq!(el.style("color").as_deref(), Some("red"));
    }
    assert_eq!(els[0].text_content(), "first");
    assert_eq!(els[1].text_content(), "");
    assert_eq!(els[2].text_content(), "last");
}

#[test]
fn default_precedence_ignores_key_order() {
    let document = Document::new();
    let el = attach(&document, "div", Some("t"), "");
    let engine = ConditionsEngine::new(document);

    for set in [
        conditions(json!({"1": {"title": "A"}, "default": {"title": "B"}})),
        conditions(json!({"default": {"title": "B"}, "1": {"title": "A"}})),
    ] {
        engine.apply(2, set.clone(), "#t");
        assert_eq!(el.property("title"), Value::from("B"));
        engine.apply(1, set, "#t");
        assert_eq!(el.property("title"), Value::from("A"));
    }
}

#[test]
fn custom_handler_keeps_fallback_reachable() {
    let document = Document::new();
    let el = attach(&document, "p", Some("p"), "");
    let engine = ConditionsEngine::new(document);
    engine.register_handler(
        "shout",
        FnHandler::new(
            |key, _, _| key == "shout",
            |el, value, _| {
                el.set_property("textContent", Value::from(value.to_js_string().to_uppercase()))
            },
        ),
    );

    engine.apply(
        true,
        conditions(json!({"true": {"shout": "hi", "aria-label": "greeting"}})),
        "#p",
    );

    assert_eq!(el.text_content(), "HI");
    assert_eq!(el.get_attribute("aria-label").as_deref(), Some("greeting"));
    assert_eq!(
        engine.handlers().last().map(String::as_str),
        Some(whenstate::prelude::core::FALLBACK_HANDLER)
    );
}

#[test]
fn custom_matcher_appended_after_builtins() {
    let document = Document::new();
    let el = attach(&document, "p", Some("p"), "");
    let engine = ConditionsEngine::new(document);
    engine.register_matcher(
        "even",
        FnMatcher::new(
            |condition, _| condition == "even",
            |value, _| value.as_f64().is_some_and(|n| n % 2.0 == 0.0),
        ),
    );

    let set = conditions(json!({"even": {"title": "even"}, "default": {"title": "odd"}}));
    engine.apply(4, set.clone(), "#p");
    assert_eq!(el.property("title"), Value::from("even"));
    engine.apply(3, set, "#p");
    assert_eq!(el.property("title"), Value::from("odd"));
}

#[test]
fn match_miss_leaves_dom_untouched() {
    let document = Document::new();
    let el = attach(&document, "div", Some("box"), "keep");
    el.set_style("color", "blue");
    let engine = ConditionsEngine::new(document);

    let binding = engine.when_state(
        "nothing",
        conditions(json!({"true": {"style": {"color": "red"}, "className": "changed"}})),
        "#box",
        BindingOptions::default(),
    );

    assert_eq!(binding.last_outcome(), Some(CycleOutcome::NoMatch));
    assert_eq!(el.style("color").as_deref(), Some("blue"));
    assert_eq!(el.class_name(), "keep");
}

#[test]
fn invalid_pattern_does_not_abort_matching() {
    let document = Document::new();
    let el = attach(&document, "div", Some("x"), "");
    let engine = ConditionsEngine::new(document);

    engine.apply(
        true,
        conditions(json!({"/(/": {"title": "bad"}, "true": {"title": "good"}})),
        "#x",
    );
    assert_eq!(el.property("title"), Value::from("good"));
}

#[test]
fn unresolved_target_aborts_cycle_quietly() {
    let engine = ConditionsEngine::new(Document::new());
    let binding = engine.when_state(
        true,
        conditions(json!({"true": {"title": "x"}})),
        "#missing",
        BindingOptions::default(),
    );
    assert_eq!(binding.last_outcome(), Some(CycleOutcome::Unresolved));

    let binding = engine.when_state(
        true,
        conditions(json!({"true": {"title": "x"}})),
        "ul > li",
        BindingOptions::default(),
    );
    assert_eq!(binding.last_outcome(), Some(CycleOutcome::Unresolved));
}

struct IdCache {
    hits: Rc<Cell<usize>>,
    element: Element,
}

impl ElementCache for IdCache {
    fn by_id(&self, id: &str) -> Option<Element> {
        (id == "cached").then(|| {
            self.hits.set(self.hits.get() + 1);
            self.element.clone()
        })
    }
}

#[test]
fn element_cache_is_preferred() {
    let document = Document::new();
    let in_document = attach(&document, "div", Some("cached"), "");
    let from_cache = Element::new("div");
    let hits = Rc::new(Cell::new(0));
    let engine = ConditionsEngine::builder(document)
        .element_cache(IdCache {
            hits: Rc::clone(&hits),
            element: from_cache.clone(),
        })
        .build();

    engine.apply(true, conditions(json!({"true": {"title": "hit"}})), "#cached");

    assert_eq!(hits.get(), 1);
    assert_eq!(from_cache.property("title"), Value::from("hit"));
    assert_eq!(in_document.property("title"), Value::from(""));
}

#[test]
fn update_hook_receives_whole_config() {
    let document = Document::new();
    let el = attach(&document, "div", Some("w"), "");
    let seen = Rc::new(Cell::new(0));
    let s = Rc::clone(&seen);
    el.set_update_hook(move |_, config| {
        s.set(config.len());
        Ok(())
    });
    let engine = ConditionsEngine::new(document);

    engine.apply(true, conditions(json!({"true": {"title": "a", "hidden": true}})), "#w");
    assert_eq!(seen.get(), 2);
    assert_eq!(el.property("title"), Value::from(""));

    let without_hook = ConditionsEngine::builder(engine.document().clone())
        .options(EngineOptions::from_json(json!({"useUpdateHook": false})).expect("options"))
        .build();
    without_hook.apply(true, conditions(json!({"true": {"title": "a"}})), "#w");
    assert_eq!(el.property("title"), Value::from("a"));
}

#[test]
fn read_only_key_fails_alone() {
    let document = Document::new();
    let el = attach(&document, "div", Some("r"), "");
    let engine = ConditionsEngine::new(document);

    engine.apply(
        true,
        conditions(json!({"true": {"tagName": "span", "title": "kept", "dataset": {"n": 1}}})),
        "#r",
    );
    assert_eq!(el.tag(), "div");
    assert_eq!(el.property("title"), Value::from("kept"));
    assert_eq!(el.data("n").as_deref(), Some("1"));
}

//! Property-based invariant tests for the matcher table.
//!
//! 1. Boolean conditions decide strictly on boolean values
//! 2. Ranges match exactly the numbers inside `[a, b]`
//! 3. Comparison operators agree with `f64` comparisons
//! 4. Range syntax never matches non-numeric values except literally
//! 5. Arbitrary condition strings never panic and are deterministic
//! 6. The catch-all pattern matches every value
//! 7. Default-branch precedence does not depend on key order

use proptest::prelude::*;
use serde_json::json;
use whenstate_core::{CATCH_ALL_CONDITION, ConditionSet, Config, MatcherTable, Value};

fn table() -> MatcherTable {
    MatcherTable::builtin(true)
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i32..1000).prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::from),
        proptest::collection::vec("[a-z]{1,4}", 0..4).prop_map(Value::from),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Boolean conditions
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn boolean_conditions_are_strict(b in any::<bool>()) {
        let table = table();
        let value = Value::from(b);
        prop_assert_eq!(table.matches_condition(&value, "true"), b);
        prop_assert_eq!(table.matches_condition(&value, "false"), !b);
    }

    #[test]
    fn boolean_conditions_reject_non_booleans(value in arb_value()) {
        prop_assume!(!matches!(value, Value::Bool(_)));
        let table = table();
        prop_assert!(!table.matches_condition(&value, "true"));
        prop_assert!(!table.matches_condition(&value, "false"));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2-3. Numeric conditions
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn range_matches_inclusive_bounds(a in -500i32..500, width in 0i32..500, v in -1500i32..1500) {
        let b = a + width;
        let condition = format!("{a}-{b}");
        let matched = table().matches_condition(&Value::from(v), &condition);
        prop_assert_eq!(matched, a <= v && v <= b, "{} against {}", v, condition);
    }

    #[test]
    fn comparisons_agree_with_f64(x in -100i32..100, v in -100i32..100) {
        let table = table();
        let value = Value::from(v);
        prop_assert_eq!(table.matches_condition(&value, &format!(">={x}")), v >= x);
        prop_assert_eq!(table.matches_condition(&value, &format!("<={x}")), v <= x);
        prop_assert_eq!(table.matches_condition(&value, &format!(">{x}")), v > x);
        prop_assert_eq!(table.matches_condition(&value, &format!("<{x}")), v < x);
        prop_assert_eq!(table.matches_condition(&value, &format!("{x}")), v == x);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Range syntax on strings falls back to literal equality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn range_on_strings_is_literal(a in 0u32..50, b in 50u32..100, text in "[0-9-]{0,6}") {
        let condition = format!("{a}-{b}");
        let table = table();
        prop_assert_eq!(
            table.matches_condition(&Value::from(text.clone()), &condition),
            text == condition
        );
        prop_assert!(table.matches_condition(&Value::from(condition.clone()), &condition));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Robustness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn arbitrary_conditions_never_panic(value in arb_value(), condition in "\\PC{0,16}") {
        let table = table();
        let first = table.matches_condition(&value, &condition);
        let second = table.matches_condition(&value, &condition);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn catch_all_matches_everything(value in arb_value()) {
        prop_assert!(table().matches_condition(&value, CATCH_ALL_CONDITION));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Default-branch precedence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn default_is_reached_only_without_explicit_match(v in 0i32..5, default_first in any::<bool>()) {
        let explicit = Config::from_json(json!({"textContent": "A"})).expect("config");
        let fallback = Config::from_json(json!({"textContent": "B"})).expect("config");
        let set = if default_first {
            ConditionSet::new().otherwise(fallback).when("1", explicit)
        } else {
            ConditionSet::new().when("1", explicit).otherwise(fallback)
        }
        .with_default_last();

        let table = table();
        let value = Value::from(v);
        let (_, config) = table.first_match(&value, &set).expect("default always matches");
        let expected = if v == 1 { "A" } else { "B" };
        prop_assert_eq!(config.get("textContent"), Some(&Value::from(expected)));
    }
}

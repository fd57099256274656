#![forbid(unsafe_code)]

//! Condition matching.
//!
//! A [`MatcherTable`] is an ordered list of named [`Matcher`] strategies. For
//! each condition string the first matcher whose [`Matcher::test`] accepts
//! decides the outcome through [`Matcher::matches`]; later matchers are not
//! consulted even when that result is `false`. When no matcher accepts, the
//! condition is compared literally against `String(value)`.
//!
//! # Built-in order
//!
//! | name | conditions |
//! |------|------------|
//! | `boolean` | `true`, `false` |
//! | `truthiness` | `truthy`, `falsy` |
//! | `nullish` | `null`, `undefined` |
//! | `empty` | `empty` |
//! | `quoted` | `'text'`, `"text"` |
//! | `substring` | `includes:x`, `startsWith:x`, `endsWith:x` |
//! | `regex` | `/pattern/flags` |
//! | `numeric` | `a-b`, `n`, `>=n`, `<=n`, `>n`, `<n` (number values only) |

mod builtin;

use std::rc::Rc;

use tracing::trace;

pub use builtin::{
    BooleanMatcher, EmptyMatcher, NullishMatcher, NumericMatcher, QuotedMatcher, RegexMatcher,
    SubstringMatcher, TruthinessMatcher,
};

use crate::config::{Config, ConditionSet};
use crate::error::{Error, Result};
use crate::value::Value;

/// Strategy deciding whether a condition string matches a value.
pub trait Matcher {
    /// Whether this matcher is responsible for `condition`.
    fn test(&self, condition: &str, value: &Value) -> bool;

    /// Outcome for a condition this matcher accepted.
    fn matches(&self, value: &Value, condition: &str) -> bool;
}

/// Matcher built from two closures.
pub struct FnMatcher<T, M> {
    test: T,
    matches: M,
}

impl<T, M> FnMatcher<T, M>
where
    T: Fn(&str, &Value) -> bool,
    M: Fn(&Value, &str) -> bool,
{
    pub fn new(test: T, matches: M) -> Self {
        Self { test, matches }
    }
}

impl<T, M> Matcher for FnMatcher<T, M>
where
    T: Fn(&str, &Value) -> bool,
    M: Fn(&Value, &str) -> bool,
{
    fn test(&self, condition: &str, value: &Value) -> bool {
        (self.test)(condition, value)
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        (self.matches)(value, condition)
    }
}

#[derive(Clone)]
struct Entry {
    name: Rc<str>,
    matcher: Rc<dyn Matcher>,
}

/// Ordered matcher strategies. Cloning shares the matchers.
#[derive(Clone, Default)]
pub struct MatcherTable {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for MatcherTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &*e.name))
            .finish()
    }
}

impl MatcherTable {
    /// Table with no matchers: every condition falls through to the literal
    /// comparison.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in matchers in evaluation order.
    #[must_use]
    pub fn builtin(cache_patterns: bool) -> Self {
        let mut table = Self::empty();
        let builtins: [(&str, Rc<dyn Matcher>); 8] = [
            ("boolean", Rc::new(BooleanMatcher)),
            ("truthiness", Rc::new(TruthinessMatcher)),
            ("nullish", Rc::new(NullishMatcher)),
            ("empty", Rc::new(EmptyMatcher)),
            ("quoted", Rc::new(QuotedMatcher)),
            ("substring", Rc::new(SubstringMatcher)),
            ("regex", Rc::new(RegexMatcher::new(cache_patterns))),
            ("numeric", Rc::new(NumericMatcher)),
        ];
        for (name, matcher) in builtins {
            table.entries.push(Entry {
                name: Rc::from(name),
                matcher,
            });
        }
        table
    }

    /// Append a matcher after every existing one.
    pub fn push(&mut self, name: &str, matcher: Rc<dyn Matcher>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::registry(name, "matcher name must not be blank"));
        }
        self.entries.push(Entry {
            name: Rc::from(name),
            matcher,
        });
        Ok(())
    }

    /// Names in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide one condition for `value`.
    #[must_use]
    pub fn matches_condition(&self, value: &Value, condition: &str) -> bool {
        for entry in &self.entries {
            if entry.matcher.test(condition, value) {
                let matched = entry.matcher.matches(value, condition);
                trace!(matcher = &*entry.name, condition, matched, "condition decided");
                return matched;
            }
        }
        let matched = literal_match(value, condition);
        trace!(matcher = "literal", condition, matched, "condition decided");
        matched
    }

    /// First condition in `conditions` that matches `value`.
    #[must_use]
    pub fn first_match<'a>(
        &self,
        value: &Value,
        conditions: &'a ConditionSet,
    ) -> Option<(&'a str, &'a Config)> {
        conditions
            .iter()
            .find(|(condition, _)| self.matches_condition(value, condition))
    }
}

/// Fallback comparison: `String(value) == condition`.
#[must_use]
pub fn literal_match(value: &Value, condition: &str) -> bool {
    value.to_js_string() == condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_order_is_stable() {
        assert_eq!(
            MatcherTable::builtin(true).names(),
            vec![
                "boolean",
                "truthiness",
                "nullish",
                "empty",
                "quoted",
                "substring",
                "regex",
                "numeric"
            ]
        );
    }

    #[test]
    fn first_accepting_matcher_decides() {
        let mut table = MatcherTable::empty();
        table
            .push("never", Rc::new(FnMatcher::new(|c, _| c == "x", |_, _| false)))
            .expect("valid name");
        table
            .push("always", Rc::new(FnMatcher::new(|_, _| true, |_, _| true)))
            .expect("valid name");
        assert!(!table.matches_condition(&Value::from("x"), "x"));
        assert!(table.matches_condition(&Value::from("y"), "anything"));
    }

    #[test]
    fn literal_fallback_without_matchers() {
        let table = MatcherTable::empty();
        assert!(table.matches_condition(&Value::from(3), "3"));
        assert!(!table.matches_condition(&Value::from(3), "4"));
    }

    #[test]
    fn blank_names_rejected() {
        let mut table = MatcherTable::empty();
        let err = table
            .push("  ", Rc::new(FnMatcher::new(|_, _| true, |_, _| true)))
            .unwrap_err();
        assert!(matches!(err, Error::Registry { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn first_match_respects_insertion_order() {
        let table = MatcherTable::builtin(true);
        let set = ConditionSet::from_json(json!({
            "truthy": {"n": 1},
            "true": {"n": 2},
        }))
        .expect("valid set");
        let (condition, _) = table.first_match(&Value::from(true), &set).expect("match");
        assert_eq!(condition, "truthy");
    }
}

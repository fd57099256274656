use std::cell::RefCell;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use tracing::error;

use super::Matcher;
use crate::error::{Error, Result};
use crate::value::Value;

/// `true` / `false`: strict boolean equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanMatcher;

impl Matcher for BooleanMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        matches!(condition, "true" | "false")
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        value.as_bool() == Some(condition == "true")
    }
}

/// `truthy` / `falsy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthinessMatcher;

impl Matcher for TruthinessMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        matches!(condition, "truthy" | "falsy")
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        value.is_truthy() == (condition == "truthy")
    }
}

/// `null` / `undefined`: strict identity, no cross-matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullishMatcher;

impl Matcher for NullishMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        matches!(condition, "null" | "undefined")
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        match condition {
            "null" => matches!(value, Value::Null),
            _ => matches!(value, Value::Undefined),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyMatcher;

impl Matcher for EmptyMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        condition == "empty"
    }

    fn matches(&self, value: &Value, _condition: &str) -> bool {
        value.is_empty_value()
    }
}

/// `'text'` or `"text"`: compares `String(value)` to the quoted text.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotedMatcher;

fn unquote(condition: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        condition
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

impl Matcher for QuotedMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        condition.len() >= 2 && unquote(condition).is_some()
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        unquote(condition).is_some_and(|text| value.to_js_string() == text)
    }
}

/// `includes:x`, `startsWith:x`, `endsWith:x` on `String(value)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

const SUBSTRING_PREFIXES: [&str; 3] = ["includes:", "startsWith:", "endsWith:"];

impl Matcher for SubstringMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        SUBSTRING_PREFIXES.iter().any(|p| condition.starts_with(p))
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        let text = value.to_js_string();
        if let Some(needle) = condition.strip_prefix("includes:") {
            text.contains(needle)
        } else if let Some(needle) = condition.strip_prefix("startsWith:") {
            text.starts_with(needle)
        } else if let Some(needle) = condition.strip_prefix("endsWith:") {
            text.ends_with(needle)
        } else {
            false
        }
    }
}

/// `/pattern/flags`, tested against `String(value)`.
///
/// Patterns that fail to compile are logged and never match. With caching
/// enabled both successes and failures are remembered per condition string.
#[derive(Debug, Default)]
pub struct RegexMatcher {
    cache: Option<RefCell<FxHashMap<String, Option<Rc<Regex>>>>>,
}

impl RegexMatcher {
    #[must_use]
    pub fn new(cache_patterns: bool) -> Self {
        Self {
            cache: cache_patterns.then(|| RefCell::new(FxHashMap::default())),
        }
    }

    /// Number of cached condition strings.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.borrow().len())
    }

    fn lookup(&self, condition: &str) -> Option<Rc<Regex>> {
        let Some(cache) = &self.cache else {
            return compile_logged(condition);
        };
        if let Some(hit) = cache.borrow().get(condition) {
            return hit.clone();
        }
        let compiled = compile_logged(condition);
        cache
            .borrow_mut()
            .insert(condition.to_string(), compiled.clone());
        compiled
    }
}

fn split_pattern(condition: &str) -> Option<(&str, &str)> {
    let body = condition.strip_prefix('/')?;
    let end = body.rfind('/')?;
    Some((&body[..end], &body[end + 1..]))
}

/// Compile a `/pattern/flags` condition.
pub fn compile_pattern(condition: &str) -> Result<Regex> {
    let (pattern, flags) = split_pattern(condition).ok_or_else(|| {
        Error::invalid_config(format!("{condition:?} is not a /pattern/flags literal"))
    })?;
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'u' | 'g' | 'y' => &mut builder,
            other => {
                return Err(Error::PatternFlag {
                    pattern: condition.to_string(),
                    flag: other,
                });
            }
        };
    }
    builder.build().map_err(|source| Error::Pattern {
        pattern: condition.to_string(),
        source,
    })
}

fn compile_logged(condition: &str) -> Option<Rc<Regex>> {
    match compile_pattern(condition) {
        Ok(regex) => Some(Rc::new(regex)),
        Err(err) => {
            error!(condition, error = %err, "pattern condition does not compile; treating as non-match");
            None
        }
    }
}

impl Matcher for RegexMatcher {
    fn test(&self, condition: &str, _value: &Value) -> bool {
        condition.len() >= 2 && split_pattern(condition).is_some()
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        self.lookup(condition)
            .is_some_and(|regex| regex.is_match(&value.to_js_string()))
    }
}

/// Numeric conditions. Only consulted for number values; other values fall
/// through to the literal comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericMatcher;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumericCondition {
    Range(f64, f64),
    Exact(f64),
    AtLeast(f64),
    AtMost(f64),
    Above(f64),
    Below(f64),
}

/// `-?digits(.digits)?`
fn parse_decimal(text: &str) -> Option<f64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || fraction.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    text.parse().ok()
}

impl NumericCondition {
    pub(crate) fn parse(condition: &str) -> Option<Self> {
        let condition = condition.trim();
        for (i, _) in condition.match_indices('-').filter(|(i, _)| *i > 0) {
            if let (Some(lo), Some(hi)) = (
                parse_decimal(&condition[..i]),
                parse_decimal(&condition[i + 1..]),
            ) {
                return Some(Self::Range(lo, hi));
            }
        }
        if let Some(n) = parse_decimal(condition) {
            return Some(Self::Exact(n));
        }
        let operators: [(&str, fn(f64) -> Self); 4] = [
            (">=", Self::AtLeast),
            ("<=", Self::AtMost),
            (">", Self::Above),
            ("<", Self::Below),
        ];
        operators.into_iter().find_map(|(op, make)| {
            condition
                .strip_prefix(op)
                .and_then(|rest| parse_decimal(rest.trim()))
                .map(make)
        })
    }

    pub(crate) fn holds(self, n: f64) -> bool {
        match self {
            Self::Range(lo, hi) => lo <= n && n <= hi,
            Self::Exact(x) => n == x,
            Self::AtLeast(x) => n >= x,
            Self::AtMost(x) => n <= x,
            Self::Above(x) => n > x,
            Self::Below(x) => n < x,
        }
    }
}

impl Matcher for NumericMatcher {
    fn test(&self, condition: &str, value: &Value) -> bool {
        matches!(value, Value::Number(_)) && NumericCondition::parse(condition).is_some()
    }

    fn matches(&self, value: &Value, condition: &str) -> bool {
        match (value, NumericCondition::parse(condition)) {
            (Value::Number(n), Some(parsed)) => parsed.holds(*n),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherTable;
    use serde_json::json;

    fn check(value: impl Into<Value>, condition: &str) -> bool {
        MatcherTable::builtin(true).matches_condition(&value.into(), condition)
    }

    #[test]
    fn boolean_is_strict() {
        assert!(check(true, "true"));
        assert!(!check(true, "false"));
        assert!(!check("true", "true"));
        assert!(!check(1, "true"));
    }

    #[test]
    fn truthiness_and_nullish() {
        assert!(check(1, "truthy"));
        assert!(check("", "falsy"));
        assert!(check(Value::Null, "null"));
        assert!(!check(Value::Undefined, "null"));
        assert!(check(Value::Undefined, "undefined"));
    }

    #[test]
    fn empty_values() {
        assert!(check("", "empty"));
        assert!(check(Value::from(json!([])), "empty"));
        assert!(check(Value::from(json!({})), "empty"));
        assert!(!check(0, "empty"));
        assert!(!check(false, "empty"));
    }

    #[test]
    fn quoted_literals() {
        assert!(check("true", "'true'"));
        assert!(check(5, "\"5\""));
        assert!(!check("abc", "'ab'"));
    }

    #[test]
    fn substring_predicates() {
        assert!(check("hello world", "includes:lo w"));
        assert!(check("hello", "startsWith:he"));
        assert!(check("hello", "endsWith:llo"));
        assert!(check(Value::from(vec!["x", "y"]), "includes:x"));
        assert!(!check("hello", "endsWith:he"));
    }

    #[test]
    fn regex_flags() {
        assert!(check("ABC", "/^ab/i"));
        assert!(!check("ABC", "/^ab/"));
        assert!(check("a\nb", "/^b$/m"));
        assert!(check("anything", r"/^[\s\S]*$/"));
    }

    #[test]
    fn bad_pattern_is_non_match_and_cached() {
        let matcher = RegexMatcher::new(true);
        assert!(!matcher.matches(&Value::from("("), "/(/"));
        assert!(!matcher.matches(&Value::from("("), "/(/"));
        assert_eq!(matcher.cached(), 1);
        assert!(matches!(compile_pattern("/a/q"), Err(Error::PatternFlag { flag: 'q', .. })));
        assert!(matches!(compile_pattern("/(/"), Err(Error::Pattern { .. })));
    }

    #[test]
    fn uncached_matcher_keeps_nothing() {
        let matcher = RegexMatcher::new(false);
        assert!(matcher.matches(&Value::from("abc"), "/b/"));
        assert_eq!(matcher.cached(), 0);
    }

    #[test]
    fn numeric_precedence() {
        assert_eq!(NumericCondition::parse("1-5"), Some(NumericCondition::Range(1.0, 5.0)));
        assert_eq!(NumericCondition::parse("-5--1"), Some(NumericCondition::Range(-5.0, -1.0)));
        assert_eq!(NumericCondition::parse("-3"), Some(NumericCondition::Exact(-3.0)));
        assert_eq!(NumericCondition::parse(">=5"), Some(NumericCondition::AtLeast(5.0)));
        assert_eq!(NumericCondition::parse("<= 2.5"), Some(NumericCondition::AtMost(2.5)));
        assert_eq!(NumericCondition::parse(">0"), Some(NumericCondition::Above(0.0)));
        assert_eq!(NumericCondition::parse("<0"), Some(NumericCondition::Below(0.0)));
        assert_eq!(NumericCondition::parse("abc"), None);
        assert_eq!(NumericCondition::parse("1e3"), None);
    }

    #[test]
    fn numeric_only_for_numbers() {
        assert!(check(3, "1-5"));
        assert!(check(1, "1-5"));
        assert!(check(5, "1-5"));
        assert!(!check(6, "1-5"));
        assert!(check("1-5", "1-5"));
        assert!(!check("3", "1-5"));
        assert!(check(5, ">=5"));
        assert!(!check(5, ">5"));
        assert!(check(2.5, "2.5"));
    }
}

#![forbid(unsafe_code)]

//! Config objects and condition sets.
//!
//! A [`Config`] is the property bag applied to elements once a condition
//! matches. Its keys split into *shared* keys, applied to every resolved
//! element, and *indexed* keys (`"0"`, `"-1"`, ...) applied to one element by
//! position.
//!
//! A [`ConditionSet`] maps condition strings to configs in insertion order.
//! The `"default"` entry is special: [`ConditionSet::with_default_last`]
//! re-expresses it as a catch-all pattern placed after every explicit
//! condition.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Condition key rewritten by [`ConditionSet::with_default_last`].
pub const DEFAULT_CONDITION: &str = "default";

/// Pattern condition that matches every string coercion.
pub const CATCH_ALL_CONDITION: &str = r"/^[\s\S]*$/";

/// Parse an indexed key (`^-?\d+$`).
///
/// Indices beyond `i64` saturate, which always lands out of range at
/// dispatch time.
#[must_use]
pub fn index_key(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(key.parse::<i64>().unwrap_or(if key.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

/// Property configuration applied to matched elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    entries: Map,
}

/// Keys of one config split by application scope.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub shared: Config,
    pub indexed: Vec<IndexedEntry<'a>>,
}

#[derive(Debug)]
pub struct IndexedEntry<'a> {
    pub key: &'a str,
    pub index: i64,
    pub value: &'a Value,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Convert an object value. Anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(Error::invalid_config(format!(
                "config must be an object, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Self::from_value(Value::from(json))
    }

    /// Split keys into shared and indexed entries, preserving order within
    /// each group.
    #[must_use]
    pub fn partition(&self) -> Partition<'_> {
        let mut partition = Partition::default();
        for (key, value) in &self.entries {
            match index_key(key) {
                Some(index) => partition.indexed.push(IndexedEntry {
                    key,
                    index,
                    value,
                }),
                None => {
                    partition.shared.entries.insert(key.clone(), value.clone());
                }
            }
        }
        partition
    }
}

impl From<Map> for Config {
    fn from(entries: Map) -> Self {
        Self { entries }
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::Object(config.entries)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered mapping from condition strings to configs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    entries: IndexMap<String, Config>,
}

impl ConditionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn when(mut self, condition: impl Into<String>, config: Config) -> Self {
        self.entries.insert(condition.into(), config);
        self
    }

    /// Builder-style insert of the `"default"` branch.
    #[must_use]
    pub fn otherwise(self, config: Config) -> Self {
        self.when(DEFAULT_CONDITION, config)
    }

    pub fn insert(&mut self, condition: impl Into<String>, config: Config) -> Option<Config> {
        self.entries.insert(condition.into(), config)
    }

    #[must_use]
    pub fn get(&self, condition: &str) -> Option<&Config> {
        self.entries.get(condition)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Config)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Build from a JSON object whose values are config objects.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(Error::invalid_config("condition set must be a JSON object"));
        };
        let mut set = Self::new();
        for (condition, config) in map {
            let config = Config::from_json(config).map_err(|err| {
                Error::invalid_config(format!("condition {condition:?}: {err}"))
            })?;
            set.entries.insert(condition, config);
        }
        Ok(set)
    }

    /// Move the `"default"` branch to the end as [`CATCH_ALL_CONDITION`], so
    /// it is only reached when no explicit condition matched.
    #[must_use]
    pub fn with_default_last(mut self) -> Self {
        if let Some(default) = self.entries.shift_remove(DEFAULT_CONDITION) {
            self.entries.shift_remove(CATCH_ALL_CONDITION);
            self.entries.insert(CATCH_ALL_CONDITION.to_string(), default);
        }
        self
    }
}

impl<K: Into<String>> FromIterator<(K, Config)> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = (K, Config)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

type ConditionFactory = Rc<dyn Fn() -> Result<ConditionSet>>;

/// Where a binding gets its condition set from on every cycle.
#[derive(Clone)]
pub enum ConditionSource {
    Static(ConditionSet),
    /// Re-invoked on every cycle; reads inside it are tracked in reactive
    /// mode.
    Factory(ConditionFactory),
}

impl ConditionSource {
    pub fn factory(f: impl Fn() -> ConditionSet + 'static) -> Self {
        Self::Factory(Rc::new(move || Ok(f())))
    }

    pub fn try_factory(f: impl Fn() -> Result<ConditionSet> + 'static) -> Self {
        Self::Factory(Rc::new(f))
    }

    /// Produce a fresh condition set with the default branch moved last.
    pub fn evaluate(&self) -> Result<ConditionSet> {
        let set = match self {
            Self::Static(set) => set.clone(),
            Self::Factory(f) => f()?,
        };
        Ok(set.with_default_last())
    }
}

impl From<ConditionSet> for ConditionSource {
    fn from(set: ConditionSet) -> Self {
        Self::Static(set)
    }
}

impl std::fmt::Debug for ConditionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(set) => f.debug_tuple("Static").field(set).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

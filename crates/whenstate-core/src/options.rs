//! Engine and binding options.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-binding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BindingOptions {
    /// Track the value and re-run on change when a reactive host is
    /// available. `false` forces a one-shot binding.
    pub reactive: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self { reactive: true }
    }
}

impl BindingOptions {
    /// One-shot binding regardless of the host.
    #[must_use]
    pub fn static_only() -> Self {
        Self { reactive: false }
    }

    #[must_use]
    pub fn with_reactive(mut self, reactive: bool) -> Self {
        self.reactive = reactive;
        self
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

/// Engine-wide options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Cache compiled `/pattern/` conditions, failures included.
    pub cache_patterns: bool,
    /// Hand whole configs to an element's update hook when it has one.
    pub use_update_hook: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_patterns: true,
            use_update_hook: true,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn with_cache_patterns(mut self, cache: bool) -> Self {
        self.cache_patterns = cache;
        self
    }

    #[must_use]
    pub fn with_update_hook(mut self, enabled: bool) -> Self {
        self.use_update_hook = enabled;
        self
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_reactive_and_cached() {
        assert!(BindingOptions::default().reactive);
        assert!(!BindingOptions::static_only().reactive);
        let engine = EngineOptions::default();
        assert!(engine.cache_patterns && engine.use_update_hook);
    }

    #[test]
    fn json_uses_camel_case_and_fills_defaults() {
        let binding = BindingOptions::from_json(json!({"reactive": false})).expect("valid");
        assert_eq!(binding, BindingOptions::static_only());
        let engine = EngineOptions::from_json(json!({"usePatternCache": 1, "useUpdateHook": false}))
            .expect("unknown keys are ignored");
        assert_eq!(engine, EngineOptions::default().with_update_hook(false));
        assert!(EngineOptions::from_json(json!({"cachePatterns": "yes"})).is_err());
    }
}

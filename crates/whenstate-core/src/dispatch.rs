#![forbid(unsafe_code)]

//! Collection-aware config application.
//!
//! Shared keys go to every element first. Indexed keys (`"0"`, `"-1"`) then
//! apply their sub-config to one element each, negative indices counting
//! from the end. Failures are isolated per key: a failing key is logged and
//! the rest of the config and the remaining elements still apply.

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::dom::Element;
use crate::handler::HandlerTable;

/// Counts from one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Elements the shared keys were applied to.
    pub elements: usize,
    /// Keys applied successfully.
    pub applied: usize,
    /// Keys whose handler failed.
    pub failed: usize,
    /// Keys no handler accepted, plus skipped indexed entries.
    pub skipped: usize,
    /// Configs taken by an element's update hook.
    pub hooked: usize,
}

/// Map an indexed key onto `[0, len)`.
#[must_use]
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len.checked_add(index)? } else { index };
    (0..len).contains(&index).then(|| index as usize)
}

pub struct Dispatcher<'a> {
    handlers: &'a HandlerTable,
    use_update_hook: bool,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(handlers: &'a HandlerTable, use_update_hook: bool) -> Self {
        Self {
            handlers,
            use_update_hook,
        }
    }

    pub fn dispatch(&self, elements: &[Element], config: &Config) -> DispatchReport {
        let mut report = DispatchReport {
            elements: elements.len(),
            ..DispatchReport::default()
        };
        let partition = config.partition();

        if !partition.shared.is_empty() {
            for element in elements {
                self.apply_config(element, &partition.shared, &mut report);
            }
        }

        for entry in &partition.indexed {
            let Some(position) = normalize_index(entry.index, elements.len()) else {
                warn!(
                    key = entry.key,
                    index = entry.index,
                    elements = elements.len(),
                    "indexed key out of range; skipping"
                );
                report.skipped += 1;
                continue;
            };
            let sub = match Config::from_value(entry.value.resolved()) {
                Ok(sub) => sub,
                Err(err) => {
                    warn!(key = entry.key, error = %err, "indexed entry is not a config; skipping");
                    report.skipped += 1;
                    continue;
                }
            };
            trace!(key = entry.key, index = position, "applying indexed config");
            self.apply_config(&elements[position], &sub, &mut report);
        }
        report
    }

    fn apply_config(&self, element: &Element, config: &Config, report: &mut DispatchReport) {
        if self.use_update_hook
            && let Some(hook) = element.update_hook()
        {
            match hook(element, config) {
                Ok(()) => {
                    report.hooked += 1;
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "element update hook failed; applying keys one by one");
                }
            }
        }
        self.apply_keys(element, config, report);
    }

    fn apply_keys(&self, element: &Element, config: &Config, report: &mut DispatchReport) {
        for (key, value) in config.iter() {
            let value = value.resolved();
            match self.handlers.apply_property(element, key, &value) {
                Ok(true) => report.applied += 1,
                Ok(false) => {
                    debug!(key, value_type = value.type_name(), "no handler accepted key");
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(key, error = %err, "failed to apply key");
                    report.failed += 1;
                }
            }
        }
    }
}

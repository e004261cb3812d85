//! Comparator configuration.

use serde::{Deserialize, Serialize};
use tyrel_common::limits::MONITORED_SUBTYPE_THRESHOLD;

/// Settings of a [`TypeComparer`](crate::TypeComparer).
///
/// Deserializes from camelCase keys; every key is optional.
///
/// ```json
/// { "erasedTypes": true, "monitorThreshold": 20 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparerOptions {
    /// Running after erasure: two references to the same symbol conform
    /// regardless of their prefixes.
    pub erased_types: bool,
    /// Recursion depth at which comparisons switch to monitored mode.
    pub monitor_threshold: u32,
}

impl Default for ComparerOptions {
    fn default() -> Self {
        Self {
            erased_types: false,
            monitor_threshold: MONITORED_SUBTYPE_THRESHOLD,
        }
    }
}

impl ComparerOptions {
    pub fn with_erased_types(mut self, erased_types: bool) -> Self {
        self.erased_types = erased_types;
        self
    }

    pub fn with_monitor_threshold(mut self, threshold: u32) -> Self {
        self.monitor_threshold = threshold;
        self
    }
}

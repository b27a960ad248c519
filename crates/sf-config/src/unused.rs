use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::pointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed prefixes used for this analysis (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Leaf pointers not under any consumed prefix (sorted, unique).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// JSON Pointer prefixes read by [`crate::ShelterFlowConfig`].
///
/// Keep in step with the typed view: a key listed here but never read would
/// hide a typo from the report.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/analytics/zero_actual_policy",
        "/replenishment/horizon_days",
        "/replenishment/buffer_fraction",
        "/daemon/bind_addr",
        "/daemon/allowed_origins",
    ]
}

/// Report config leaves nothing reads.
///
/// `Warn` always returns the report; `Fail` errors with `CONFIG_UNUSED_KEYS`
/// when the report is not clean.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers()
        .iter()
        .map(|p| pointer::normalize(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let unused: BTreeSet<String> = pointer::leaf_pointers(config_json)
        .into_iter()
        // An empty root document has nothing to report.
        .filter(|leaf| leaf != "/" || !config_json.as_object().is_some_and(|m| m.is_empty()))
        .filter(|leaf| !consumed_prefixes.iter().any(|p| pointer::covers(p, leaf)))
        .collect();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let preview: Vec<&String> = report.unused_leaf_pointers.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
             Remove them or teach the typed config to read them. First few: {:?}",
            report.unused_leaf_pointers.len(),
            preview
        );
    }

    Ok(report)
}

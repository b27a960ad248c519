use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_forecast::ZeroActualPolicy;
use sf_replenish::ReplenishmentPolicy;

/// Typed settings read from the merged config tree.
///
/// ```yaml
/// analytics:
///   zero_actual_policy: exclude      # or score_exact
/// replenishment:
///   horizon_days: 14
///   buffer_fraction: 0.2
/// daemon:
///   bind_addr: "127.0.0.1:8899"
///   allowed_origins: ["http://localhost:3000"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelterFlowConfig {
    pub analytics: AnalyticsSection,
    pub replenishment: ReplenishmentPolicy,
    pub daemon: DaemonSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSection {
    pub zero_actual_policy: ZeroActualPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub bind_addr: String,
    /// Browser origins allowed by CORS. Empty means same-origin only.
    pub allowed_origins: Vec<String>,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl ShelterFlowConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        serde_json::from_value(v.clone()).context("config does not match the ShelterFlow schema")
    }
}

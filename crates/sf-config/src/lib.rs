//! sf-config
//!
//! Layered YAML configuration for ShelterFlow binaries.
//!
//! # Loading
//! Documents merge in order: earlier layers are the base, later layers
//! override. Maps merge key by key; any other value is replaced wholesale.
//! The merged tree is converted to JSON, checked for literal secrets,
//! serialized canonically and hashed (SHA-256, hex) so a run can report
//! exactly which settings it used.
//!
//! # Typed view
//! [`ShelterFlowConfig`] reads the recognised sections. Every field has a
//! default, so an empty document is a valid config. Keys the typed view does
//! not read show up in [`report_unused_keys`].

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

mod pointer;
mod settings;
mod unused;

pub use settings::{AnalyticsSection, DaemonSection, ShelterFlowConfig};
pub use unused::{consumed_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};

/// Env var holding a comma-separated list of YAML layer paths.
pub const CONFIG_PATHS_ENV: &str = "SF_CONFIG";

/// Leaf string values starting with any of these abort the load with
/// `CONFIG_SECRET_DETECTED`. Config stores env var names, never credentials.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view over the merged tree.
    pub fn settings(&self) -> Result<ShelterFlowConfig> {
        ShelterFlowConfig::from_json(&self.config_json)
    }
}

/// Read and merge YAML files in the given order.
pub fn load_layered_yaml<P: AsRef<std::path::Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read config layer: {}", p.display()))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Merge in-memory YAML documents in the given order.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(serde_json::Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let layer = match layer {
            // An empty document contributes nothing.
            serde_yaml::Value::Null => continue,
            other => serde_json::to_value(other)
                .with_context(|| format!("layer {i}: yaml to json conversion failed"))?,
        };
        merged = deep_merge(merged, layer);
    }

    reject_secret_literals(&merged)?;

    let canonical_json = canonical_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Split an `SF_CONFIG`-style value into paths. Blank entries are skipped.
pub fn paths_from_env_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let prior = base_map.remove(&k).unwrap_or(Value::Null);
                base_map.insert(k, deep_merge(prior, v));
            }
            Value::Object(base_map)
        }
        (_, replacement) => replacement,
    }
}

/// Compact JSON with map keys sorted at every level, so key order in the
/// source YAML never affects the hash.
fn canonical_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sorted(v)).context("canonical json serialize failed")
}

fn sorted(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sorted(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    for ptr in pointer::leaf_pointers(v) {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

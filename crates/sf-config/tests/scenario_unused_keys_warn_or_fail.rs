//! Unused-key report.
//!
//! GREEN when:
//! - Keys the typed config never reads are reported in Warn mode without error.
//! - The same keys fail the load check in Fail mode with CONFIG_UNUSED_KEYS.
//! - Recognised keys (including list elements under a recognised key) are
//!   never flagged, and a typo'd key is.
//! - Report ordering is deterministic.

use sf_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

#[test]
fn warn_mode_reports_without_error() {
    let yaml = r#"
analytics:
  zero_actual_policy: exclude
legacy:
  bar: 2
  foo: 1
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/bar".to_string(), "/legacy/foo".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = "replenishment:\n  horizon_dayz: 10\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("/replenishment/horizon_dayz"), "got: {msg}");
}

#[test]
fn recognised_keys_are_clean() {
    let yaml = r#"
analytics:
  zero_actual_policy: score_exact
replenishment:
  horizon_days: 10
  buffer_fraction: 0.1
daemon:
  bind_addr: "0.0.0.0:8899"
  allowed_origins: ["http://localhost:3000", "https://ops.example.org"]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.consumed_prefixes.len(), 5);
}

#[test]
fn empty_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

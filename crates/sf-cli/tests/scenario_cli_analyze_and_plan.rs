//! `sf` end to end against CSV and YAML fixtures.
//!
//! GREEN when:
//! - `sf analyze` prints the summary JSON, honouring --policy and --daily.
//! - `sf analyze` on a malformed CSV fails with the row number.
//! - `sf plan` prints a pending order when stock runs short and `null` when
//!   it does not, reading the policy from --config.
//! - `sf config-hash` prints a stable hash and refuses literal secrets.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let p = dir.path().join(name);
    std::fs::write(&p, body).unwrap();
    p
}

fn sf() -> Command {
    Command::cargo_bin("sf").unwrap()
}

fn stdout_json(out: &[u8]) -> serde_json::Value {
    serde_json::from_slice(out).expect("stdout is not JSON")
}

const SERIES: &str = "timestamp,predicted,actual\n\
2024-01-01,110,100\n\
2024-01-02,90,100\n\
2024-01-03,5,0\n";

#[test]
fn analyze_prints_summary() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "series.csv", SERIES);

    let out = sf()
        .args(["analyze", "--series"])
        .arg(&csv)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&out);
    assert_eq!(json["accuracy"], 90);
    assert_eq!(json["zero_actual_policy"], "exclude");
    assert_eq!(json["average_usage"], "66.7");

    let out = sf()
        .args(["analyze", "--policy", "score-exact", "--series"])
        .arg(&csv)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_json(&out)["accuracy"], 60);
}

#[test]
fn analyze_policy_comes_from_config() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "series.csv", SERIES);
    let cfg = write(&dir, "sf.yaml", "analytics:\n  zero_actual_policy: score_exact\n");

    let out = sf()
        .args(["analyze", "--series"])
        .arg(&csv)
        .arg("--config")
        .arg(&cfg)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_json(&out)["zero_actual_policy"], "score_exact");
}

#[test]
fn analyze_daily_fills_gaps() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "hourly.csv",
        "timestamp,predicted,actual\n\
         2024-01-01T06:00:00Z,10,10\n\
         2024-01-01T18:00:00Z,10,10\n\
         2024-01-04T12:00:00Z,10,10\n",
    );

    let out = sf()
        .args(["analyze", "--daily", "--series"])
        .arg(&csv)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&out);
    assert_eq!(json["points"], 4);
    assert_eq!(json["accuracy"], 100);
}

#[test]
fn analyze_rejects_malformed_series() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "bad.csv",
        "timestamp,predicted,actual\n2024-01-01,10,10\n2024-01-02,ten,10\n",
    );

    sf().args(["analyze", "--series"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 3"));
}

#[test]
fn plan_prints_order_or_null() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "series.csv",
        "timestamp,predicted,actual\n2024-01-01,10,9\n2024-01-02,10,11\n",
    );

    let out = sf()
        .args(["plan", "--shelter", "shelter-1", "--item", "food", "--inventory", "30", "--series"])
        .arg(&csv)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = stdout_json(&out);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["shelter_id"], "shelter-1");
    assert_eq!(json["order_quantity"], 110.0);

    // 30 / 10 = 3 days: short under the default policy, fine with a 2-day one.
    let cfg = write(
        &dir,
        "short.yaml",
        "replenishment:\n  horizon_days: 2\n  buffer_fraction: 0.0\n",
    );
    sf().args(["plan", "--shelter", "shelter-1", "--item", "food", "--inventory", "30", "--series"])
        .arg(&csv)
        .arg("--config")
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::eq("null").trim());
}

#[test]
fn config_hash_is_stable_and_guards_secrets() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.yaml", "replenishment:\n  horizon_days: 10\n  buffer_fraction: 0.1\n");
    let b = write(&dir, "b.yaml", "replenishment:\n  buffer_fraction: 0.1\n  horizon_days: 10\n");

    let hash_of = |p: &PathBuf| {
        let out = sf()
            .arg("config-hash")
            .arg(p)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_string()
    };
    let ha = hash_of(&a);
    assert!(ha.starts_with("config_hash="));
    assert_eq!(ha, hash_of(&b));

    let leaked = write(&dir, "leak.yaml", "api:\n  token: \"ghp_abcdefghijklmnop\"\n");
    sf().arg("config-hash")
        .arg(&leaked)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}

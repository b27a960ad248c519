//! Reference values operators rely on.
//!
//! GREEN when:
//! - Empty series: accuracy 0, average usage "0".
//! - Perfect prediction scores 100; a 20% relative error scores 80.
//! - Average of actuals 10 and 20 displays as "15.0".
//! - MAPE above 1 yields a negative accuracy (not clamped).

use chrono::{Duration, TimeZone, Utc};
use sf_forecast::{
    compute_accuracy, compute_average_usage, summarize, ForecastPoint, ForecastSeries,
    ZeroActualPolicy,
};

fn series(pairs: &[(f64, f64)]) -> ForecastSeries {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ForecastSeries::new(
        pairs
            .iter()
            .enumerate()
            .map(|(i, (p, a))| ForecastPoint::new(t0 + Duration::days(i as i64), *p, *a))
            .collect(),
    )
    .unwrap()
}

const POLICIES: [ZeroActualPolicy; 2] = [ZeroActualPolicy::Exclude, ZeroActualPolicy::ScoreExact];

#[test]
fn empty_series_defaults() {
    let s = ForecastSeries::empty();
    for policy in POLICIES {
        assert_eq!(compute_accuracy(&s, policy), 0);
    }
    let usage = compute_average_usage(&s);
    assert!(usage.is_empty());
    assert_eq!(usage.value(), 0.0);
    assert_eq!(usage.to_string(), "0");
}

#[test]
fn perfect_prediction_is_100() {
    for policy in POLICIES {
        assert_eq!(compute_accuracy(&series(&[(100.0, 100.0)]), policy), 100);
    }
}

#[test]
fn twenty_percent_error_is_80() {
    for policy in POLICIES {
        assert_eq!(compute_accuracy(&series(&[(120.0, 100.0)]), policy), 80);
        // under-prediction by the same margin scores the same
        assert_eq!(compute_accuracy(&series(&[(80.0, 100.0)]), policy), 80);
    }
}

#[test]
fn average_usage_of_10_and_20_is_15() {
    let usage = compute_average_usage(&series(&[(0.0, 10.0), (0.0, 20.0)]));
    assert_eq!(usage.value(), 15.0);
    assert_eq!(usage.to_string(), "15.0");
}

#[test]
fn large_errors_go_negative_without_clamping() {
    // |350 - 100| / 100 = 2.5 → (1 - 2.5) * 100 = -150
    let s = series(&[(350.0, 100.0)]);
    assert_eq!(compute_accuracy(&s, ZeroActualPolicy::Exclude), -150);
}

#[test]
fn negative_half_rounds_up() {
    // MAPE 1.125 → (1 - 1.125) * 100 = -12.5 → -12
    let s = series(&[(212.5, 100.0)]);
    assert_eq!(compute_accuracy(&s, ZeroActualPolicy::Exclude), -12);
    // MAPE 0.125 → 87.5 → 88
    assert_eq!(
        compute_accuracy(&series(&[(112.5, 100.0)]), ZeroActualPolicy::Exclude),
        88
    );
}

#[test]
fn accuracy_does_not_depend_on_point_order() {
    let a = series(&[(120.0, 100.0), (50.0, 40.0), (9.0, 10.0)]);
    let b = series(&[(9.0, 10.0), (120.0, 100.0), (50.0, 40.0)]);
    for policy in POLICIES {
        assert_eq!(compute_accuracy(&a, policy), compute_accuracy(&b, policy));
    }
    assert_eq!(
        compute_average_usage(&a).to_string(),
        compute_average_usage(&b).to_string()
    );
}

#[test]
fn summary_serializes_display_usage() {
    let sum = summarize(&series(&[(0.0, 10.0), (0.0, 20.0)]), ZeroActualPolicy::Exclude);
    let json = serde_json::to_value(&sum).unwrap();
    assert_eq!(json["average_usage"], "15.0");
    assert_eq!(json["zero_actual_policy"], "exclude");
    assert_eq!(json["points"], 2);
}

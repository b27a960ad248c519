//! Forecast-accuracy analytics.
//!
//! Two numbers operators read at a glance:
//!
//! - **accuracy**: `round((1 − MAPE) × 100)` as an integer percent. Not
//!   clamped; a MAPE above 1 gives a negative accuracy.
//! - **average usage**: plain mean of `actual`, displayed with one decimal.
//!
//! Degenerate inputs are not errors. An empty series (or one with no scorable
//! points) has accuracy `0` and average usage `"0"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ForecastPoint, ForecastSeries};

// ---------------------------------------------------------------------------
// ZeroActualPolicy
// ---------------------------------------------------------------------------

/// How a point with `actual == 0` enters the error set. The relative error is
/// undefined there, so one of these must be chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroActualPolicy {
    /// Drop the point from the MAPE entirely.
    #[default]
    Exclude,
    /// Score the point: error 0 if `predicted == 0`, error 1 otherwise.
    ScoreExact,
}

impl ZeroActualPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::ScoreExact => "score_exact",
        }
    }
}

impl fmt::Display for ZeroActualPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown zero-actual policy '{0}' (expected exclude | score_exact)")]
pub struct UnknownPolicy(pub String);

impl FromStr for ZeroActualPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "exclude" => Ok(Self::Exclude),
            "score_exact" => Ok(Self::ScoreExact),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Accuracy
// ---------------------------------------------------------------------------

/// Absolute relative error of one point, or `None` when the point is excluded.
fn error_term(p: &ForecastPoint, policy: ZeroActualPolicy) -> Option<f64> {
    if p.actual == 0.0 {
        return match policy {
            ZeroActualPolicy::Exclude => None,
            ZeroActualPolicy::ScoreExact => Some(if p.predicted == 0.0 { 0.0 } else { 1.0 }),
        };
    }
    Some((p.predicted - p.actual).abs() / p.actual)
}

/// Mean absolute percentage error over the scorable points, with the count of
/// points it was computed from. `None` when nothing was scorable.
pub fn mean_absolute_percentage_error(
    series: &ForecastSeries,
    policy: ZeroActualPolicy,
) -> Option<(f64, usize)> {
    let (sum, n) = series
        .points()
        .iter()
        .filter_map(|p| error_term(p, policy))
        .fold((0.0_f64, 0_usize), |(sum, n), e| (sum + e, n + 1));

    if n == 0 {
        None
    } else {
        Some((sum / n as f64, n))
    }
}

/// Forecast accuracy as an integer percent.
///
/// `0` for an empty series and for a series where every point was excluded.
/// Rounds half up, so `-2.5` becomes `-2`.
pub fn compute_accuracy(series: &ForecastSeries, policy: ZeroActualPolicy) -> i64 {
    match mean_absolute_percentage_error(series, policy) {
        Some((mape, _)) => round_half_up((1.0 - mape) * 100.0),
        None => 0,
    }
}

/// Nearest integer, ties toward positive infinity.
///
/// Results outside the `i64` range saturate to `i64::MIN` / `i64::MAX`; a
/// near-zero `actual` can push the error that far. `NaN` maps to `0`.
fn round_half_up(x: f64) -> i64 {
    if x.is_nan() {
        return 0;
    }
    let floor = x.floor();
    // `x - floor` is exact, so values just under a half stay below it.
    let rounded = if x - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded >= i64::MAX as f64 {
        i64::MAX
    } else if rounded <= i64::MIN as f64 {
        i64::MIN
    } else {
        rounded as i64
    }
}

// ---------------------------------------------------------------------------
// Average usage
// ---------------------------------------------------------------------------

/// Mean of observed consumption. Displays as `"0"` for an empty series and
/// with exactly one decimal otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageUsage(Option<f64>);

impl AverageUsage {
    /// Unrounded mean; `0.0` for an empty series.
    pub fn value(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }

    /// True when there were no points to average.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for AverageUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("0"),
            Some(mean) => f.write_str(&one_decimal_half_up(mean)),
        }
    }
}

/// Longest exact fractional expansion an `f64` can have.
const F64_EXACT_FRACTION_DIGITS: usize = 1074;

/// One-decimal rendering of the exact binary value, ties away from zero.
///
/// `0.35` is stored just below the half and prints `"0.3"`; `0.25` is an exact
/// tie and prints `"0.3"`. Scaling by ten before rounding would move both.
fn one_decimal_half_up(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    let exact = format!("{:.*}", F64_EXACT_FRACTION_DIGITS, x.abs());
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), "0"));
    let frac = frac.as_bytes();

    let mut digits: Vec<u8> = int_part.bytes().collect();
    digits.push(frac.first().copied().unwrap_or(b'0'));
    if frac.get(1).copied().unwrap_or(b'0') >= b'5' {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let tenths = digits.pop().map_or('0', char::from);
    let whole = String::from_utf8_lossy(&digits);
    let sign = if x < 0.0 { "-" } else { "" };
    format!("{sign}{whole}.{tenths}")
}

/// Straight arithmetic mean of `actual`. No weighting, no outlier rejection.
pub fn compute_average_usage(series: &ForecastSeries) -> AverageUsage {
    if series.is_empty() {
        return AverageUsage(None);
    }
    let sum: f64 = series.points().iter().map(|p| p.actual).sum();
    AverageUsage(Some(sum / series.len() as f64))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Both metrics plus the counts behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub points: usize,
    /// Points that contributed an error term to the MAPE.
    pub scored_points: usize,
    /// Points with `actual == 0` dropped under [`ZeroActualPolicy::Exclude`].
    pub excluded_zero_actual: usize,
    pub zero_actual_policy: ZeroActualPolicy,
    /// Integer percent, may be negative.
    pub accuracy: i64,
    /// Display form: `"0"` when empty, one decimal otherwise.
    pub average_usage: String,
    /// Unrounded mean of `actual`.
    pub mean_actual: f64,
}

pub fn summarize(series: &ForecastSeries, policy: ZeroActualPolicy) -> ForecastSummary {
    let scored_points = mean_absolute_percentage_error(series, policy).map_or(0, |(_, n)| n);
    let excluded_zero_actual = match policy {
        ZeroActualPolicy::Exclude => series.points().iter().filter(|p| p.actual == 0.0).count(),
        ZeroActualPolicy::ScoreExact => 0,
    };
    let usage = compute_average_usage(series);

    ForecastSummary {
        points: series.len(),
        scored_points,
        excluded_zero_actual,
        zero_actual_policy: policy,
        accuracy: compute_accuracy(series, policy),
        average_usage: usage.to_string(),
        mean_actual: usage.value(),
    }
}

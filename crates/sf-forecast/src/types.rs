use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ForecastPoint
// ---------------------------------------------------------------------------

/// One observation: forecasted vs. observed consumption for a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted: f64,
    pub actual: f64,
}

impl ForecastPoint {
    pub fn new(timestamp: DateTime<Utc>, predicted: f64, actual: f64) -> Self {
        Self {
            timestamp,
            predicted,
            actual,
        }
    }
}

// ---------------------------------------------------------------------------
// MalformedSeries
// ---------------------------------------------------------------------------

/// Which field of a point was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesField {
    Timestamp,
    Predicted,
    Actual,
}

impl fmt::Display for SeriesField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timestamp => "timestamp",
            Self::Predicted => "predicted",
            Self::Actual => "actual",
        })
    }
}

/// What was wrong with the field.
#[derive(Debug, Clone, PartialEq)]
pub enum Defect {
    Missing,
    NotNumeric(String),
    NotFinite(f64),
    BadTimestamp(String),
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::NotNumeric(raw) => write!(f, "not a number: '{raw}'"),
            Self::NotFinite(v) => write!(f, "not finite: {v}"),
            Self::BadTimestamp(raw) => write!(f, "unparseable timestamp: '{raw}'"),
        }
    }
}

/// A series was rejected as a whole because one point is unusable.
///
/// Analytics fail closed: a missing or non-numeric value is never coerced to
/// zero, because that would present a fabricated accuracy number as real.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed series: point {index} field '{field}' is {defect}")]
pub struct MalformedSeries {
    /// Zero-based position of the offending point.
    pub index: usize,
    pub field: SeriesField,
    pub defect: Defect,
}

// ---------------------------------------------------------------------------
// Unvalidated input records
// ---------------------------------------------------------------------------

/// A numeric field as it arrives on the wire: a JSON number, numeric text, or
/// anything else (which is rejected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawNumber {
    fn to_f64(&self) -> Result<f64, Defect> {
        let v = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Defect::NotNumeric(s.clone()))?,
            Self::Other(v) => return Err(Defect::NotNumeric(v.to_string())),
        };
        if v.is_finite() {
            Ok(v)
        } else {
            Err(Defect::NotFinite(v))
        }
    }
}

impl From<f64> for RawNumber {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// An observation before validation. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPointRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub predicted: Option<RawNumber>,
    #[serde(default)]
    pub actual: Option<RawNumber>,
}

impl ForecastPointRecord {
    fn validate(&self, index: usize) -> Result<ForecastPoint, MalformedSeries> {
        let reject = |field, defect| MalformedSeries {
            index,
            field,
            defect,
        };

        let raw_ts = self
            .timestamp
            .as_deref()
            .ok_or_else(|| reject(SeriesField::Timestamp, Defect::Missing))?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
            reject(
                SeriesField::Timestamp,
                Defect::BadTimestamp(raw_ts.to_string()),
            )
        })?;

        let predicted = self
            .predicted
            .as_ref()
            .ok_or(Defect::Missing)
            .and_then(RawNumber::to_f64)
            .map_err(|d| reject(SeriesField::Predicted, d))?;

        let actual = self
            .actual
            .as_ref()
            .ok_or(Defect::Missing)
            .and_then(RawNumber::to_f64)
            .map_err(|d| reject(SeriesField::Actual, d))?;

        Ok(ForecastPoint::new(timestamp, predicted, actual))
    }
}

/// Accepts RFC 3339 (`2024-01-05T00:00:00Z`), naive date-times
/// (`2024-01-05T00:00:00`, read as UTC) and plain dates (`2024-01-05`,
/// midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = s.parse::<chrono::NaiveDateTime>() {
        return Some(ndt.and_utc());
    }
    s.parse::<NaiveDate>()
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

// ---------------------------------------------------------------------------
// ForecastSeries
// ---------------------------------------------------------------------------

/// A validated sequence of observations, in caller-supplied order.
///
/// The only way in is through validation, so every value inside is finite and
/// the analytics over it are total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<ForecastPointRecord>",
    into = "Vec<ForecastPoint>"
)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Validate already-typed points.
    ///
    /// # Errors
    /// [`MalformedSeries`] for the first point holding a NaN or infinite value.
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self, MalformedSeries> {
        for (index, p) in points.iter().enumerate() {
            for (field, v) in [
                (SeriesField::Predicted, p.predicted),
                (SeriesField::Actual, p.actual),
            ] {
                if !v.is_finite() {
                    return Err(MalformedSeries {
                        index,
                        field,
                        defect: Defect::NotFinite(v),
                    });
                }
            }
        }
        Ok(Self { points })
    }

    /// Validate wire records.
    ///
    /// # Errors
    /// [`MalformedSeries`] for the first record with a missing, non-numeric,
    /// non-finite, or unparseable field. Nothing is partially accepted.
    pub fn from_records(records: &[ForecastPointRecord]) -> Result<Self, MalformedSeries> {
        let points = records
            .iter()
            .enumerate()
            .map(|(i, r)| r.validate(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Predicted values in series order.
    pub fn predictions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted).collect()
    }

    /// Points whose UTC calendar date lies in `[start, end]` (inclusive).
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| {
                let d = p.timestamp.date_naive();
                d >= start && d <= end
            })
            .copied()
            .collect();
        Self { points }
    }

    /// Append the points of `other`, leaving the result ordered by timestamp
    /// whatever order either side was built in. Points with an equal
    /// timestamp are replaced by the newer observation, and `other` is newer
    /// than `self`.
    pub fn merge(&mut self, other: &ForecastSeries) {
        self.points.sort_by_key(|p| p.timestamp);
        self.points.dedup_by(|later, kept| {
            if later.timestamp == kept.timestamp {
                *kept = *later;
                true
            } else {
                false
            }
        });
        for p in &other.points {
            match self
                .points
                .binary_search_by(|q| q.timestamp.cmp(&p.timestamp))
            {
                Ok(i) => self.points[i] = *p,
                Err(i) => self.points.insert(i, *p),
            }
        }
    }

    pub(crate) fn from_validated(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }
}

impl TryFrom<Vec<ForecastPointRecord>> for ForecastSeries {
    type Error = MalformedSeries;

    fn try_from(records: Vec<ForecastPointRecord>) -> Result<Self, Self::Error> {
        Self::from_records(&records)
    }
}

impl From<ForecastSeries> for Vec<ForecastPoint> {
    fn from(series: ForecastSeries) -> Self {
        series.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(ts: Option<&str>, p: Option<RawNumber>, a: Option<RawNumber>) -> ForecastPointRecord {
        ForecastPointRecord {
            timestamp: ts.map(str::to_string),
            predicted: p,
            actual: a,
        }
    }

    #[test]
    fn parse_timestamp_accepts_supported_shapes() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-05"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-05T00:00:00"), Some(midnight));
        assert_eq!(
            parse_timestamp("2024-01-05T02:00:00+02:00"),
            Some(midnight)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn missing_actual_is_rejected_not_zeroed() {
        let records = vec![
            rec(Some("2024-01-01"), Some(10.0.into()), Some(10.0.into())),
            rec(Some("2024-01-02"), Some(10.0.into()), None),
        ];
        let err = ForecastSeries::from_records(&records).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.field, SeriesField::Actual);
        assert_eq!(err.defect, Defect::Missing);
    }

    #[test]
    fn numeric_text_is_accepted_other_text_is_not() {
        let ok = vec![rec(
            Some("2024-01-01"),
            Some(RawNumber::Text(" 12.5 ".into())),
            Some(10.0.into()),
        )];
        let s = ForecastSeries::from_records(&ok).unwrap();
        assert_eq!(s.points()[0].predicted, 12.5);

        let bad = vec![rec(
            Some("2024-01-01"),
            Some(RawNumber::Text("lots".into())),
            Some(10.0.into()),
        )];
        let err = ForecastSeries::from_records(&bad).unwrap_err();
        assert_eq!(err.field, SeriesField::Predicted);
        assert!(matches!(err.defect, Defect::NotNumeric(_)));
    }

    #[test]
    fn nan_text_is_rejected_as_not_finite() {
        let bad = vec![rec(
            Some("2024-01-01"),
            Some(10.0.into()),
            Some(RawNumber::Text("NaN".into())),
        )];
        let err = ForecastSeries::from_records(&bad).unwrap_err();
        assert_eq!(err.field, SeriesField::Actual);
        assert!(matches!(err.defect, Defect::NotFinite(_)));
    }

    #[test]
    fn new_rejects_infinite_values() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = ForecastSeries::new(vec![
            ForecastPoint::new(ts, 1.0, 1.0),
            ForecastPoint::new(ts, f64::INFINITY, 1.0),
        ])
        .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.field, SeriesField::Predicted);
    }

    #[test]
    fn within_is_inclusive_on_both_ends() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap();
        let s = ForecastSeries::new((1..=5).map(|d| ForecastPoint::new(day(d), 1.0, 1.0)).collect())
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let w = s.within(start, end);
        assert_eq!(w.len(), 3);
        assert_eq!(w.points()[0].timestamp, day(2));
        assert_eq!(w.points()[2].timestamp, day(4));
    }

    #[test]
    fn merge_keeps_order_and_replaces_same_timestamp() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mut s = ForecastSeries::new(vec![
            ForecastPoint::new(day(1), 1.0, 1.0),
            ForecastPoint::new(day(3), 3.0, 3.0),
        ])
        .unwrap();
        let more = ForecastSeries::new(vec![
            ForecastPoint::new(day(2), 2.0, 2.0),
            ForecastPoint::new(day(3), 30.0, 30.0),
        ])
        .unwrap();
        s.merge(&more);
        let preds: Vec<f64> = s.predictions();
        assert_eq!(preds, vec![1.0, 2.0, 30.0]);
    }

    #[test]
    fn merge_into_unsorted_series_sorts_and_deduplicates() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mut s = ForecastSeries::new(vec![
            ForecastPoint::new(day(5), 5.0, 5.0),
            ForecastPoint::new(day(1), 1.0, 1.0),
            ForecastPoint::new(day(3), 3.0, 3.0),
            ForecastPoint::new(day(1), 10.0, 10.0),
        ])
        .unwrap();
        let more = ForecastSeries::new(vec![
            ForecastPoint::new(day(4), 4.0, 4.0),
            ForecastPoint::new(day(3), 30.0, 30.0),
            ForecastPoint::new(day(2), 2.0, 2.0),
        ])
        .unwrap();
        s.merge(&more);

        assert_eq!(s.predictions(), vec![10.0, 2.0, 30.0, 4.0, 5.0]);
        assert!(s
            .points()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let ok: ForecastSeries = serde_json::from_str(
            r#"[{"timestamp":"2024-01-01","predicted":120,"actual":100}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let bad = serde_json::from_str::<ForecastSeries>(
            r#"[{"timestamp":"2024-01-01","predicted":null,"actual":100}]"#,
        );
        assert!(bad.is_err());
    }
}

//! Daily resampling of raw observations.
//!
//! Sensor feeds report consumption at irregular (often hourly) intervals while
//! the dashboard charts and scores one point per day. [`resample_daily`]
//! groups observations by UTC calendar date, averages each day, and
//! forward-fills days with no observations from the previous day.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::types::{ForecastPoint, ForecastSeries};

#[derive(Default)]
struct DayAccumulator {
    predicted_sum: f64,
    actual_sum: f64,
    count: usize,
}

impl DayAccumulator {
    fn mean(&self) -> (f64, f64) {
        let n = self.count as f64;
        (self.predicted_sum / n, self.actual_sum / n)
    }
}

/// One point per UTC day from the first to the last observed date, stamped at
/// 00:00 UTC. Input order does not matter. An empty series stays empty.
pub fn resample_daily(series: &ForecastSeries) -> ForecastSeries {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for p in series.points() {
        let acc = days.entry(p.timestamp.date_naive()).or_default();
        acc.predicted_sum += p.predicted;
        acc.actual_sum += p.actual;
        acc.count += 1;
    }

    let (Some(first), Some(last)) = (
        days.keys().next().copied(),
        days.keys().next_back().copied(),
    ) else {
        return ForecastSeries::empty();
    };

    let mut out = Vec::new();
    let mut carried = (0.0, 0.0);
    let mut day = first;
    loop {
        if let Some(acc) = days.get(&day) {
            carried = acc.mean();
        }
        out.push(ForecastPoint::new(
            day.and_time(NaiveTime::MIN).and_utc(),
            carried.0,
            carried.1,
        ));

        if day >= last {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    ForecastSeries::from_validated(out)
}

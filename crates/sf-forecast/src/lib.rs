//! sf-forecast
//!
//! Forecast analytics over externally supplied (predicted, actual) series.
//! - Validated series type: malformed input is rejected whole, never zeroed
//! - Accuracy (1 − MAPE) with an explicit zero-actual policy
//! - Average daily usage
//! - Daily resampling and CSV ingestion helpers
//! - Pure deterministic logic (no IO beyond the CSV file helper, no clock)

mod analytics;
mod daily;
mod types;

pub mod ingest_csv;

pub use analytics::{
    compute_accuracy, compute_average_usage, mean_absolute_percentage_error, summarize,
    AverageUsage, ForecastSummary, UnknownPolicy, ZeroActualPolicy,
};
pub use daily::resample_daily;
pub use ingest_csv::{parse_series_csv_file, parse_series_csv_str, CsvIngestError};
pub use types::{
    parse_timestamp, Defect, ForecastPoint, ForecastPointRecord, ForecastSeries, MalformedSeries,
    RawNumber, SeriesField,
};

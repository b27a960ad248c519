//! CSV ingestion for forecast series.
//!
//! ## CSV column contract (case-insensitive, order-independent)
//!
//! | Column      | Example                | Notes                               |
//! |-------------|------------------------|-------------------------------------|
//! | `timestamp` | `2024-01-05`           | RFC 3339, naive date-time, or date  |
//! | `predicted` | `118.5`                | Finite decimal                      |
//! | `actual`    | `100`                  | Finite decimal                      |
//!
//! Extra columns are ignored. Rows are never skipped: one
//! bad row rejects the whole file, because a series with silently dropped
//! observations would score a different accuracy than the data says.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::types::{ForecastPointRecord, ForecastSeries, MalformedSeries, RawNumber};

/// Errors produced by CSV parsing in this module.
#[derive(Debug, thiserror::Error)]
pub enum CsvIngestError {
    #[error("csv io error: {0}")]
    Io(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv missing required header column: '{0}'")]
    MissingHeader(&'static str),
    /// `row` is the 1-based line number in the file (header = line 1).
    #[error("csv row {row}: {source}")]
    Malformed {
        row: usize,
        #[source]
        source: MalformedSeries,
    },
}

/// Parse a CSV file at `path` into a validated series.
pub fn parse_series_csv_file(path: &Path) -> Result<ForecastSeries, CsvIngestError> {
    let file = File::open(path)
        .map_err(|e| CsvIngestError::Io(format!("open '{}': {e}", path.display())))?;
    parse_series_csv_reader(file)
}

/// Parse CSV from a string slice (useful for tests without touching the
/// filesystem). See [`parse_series_csv_file`].
pub fn parse_series_csv_str(src: &str) -> Result<ForecastSeries, CsvIngestError> {
    parse_series_csv_reader(src.as_bytes())
}

fn parse_series_csv_reader<R: Read>(src: R) -> Result<ForecastSeries, CsvIngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(src);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(ForecastSeries::empty());
    }

    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(CsvIngestError::MissingHeader(name))
    };
    let ts_col = column("timestamp")?;
    let predicted_col = column("predicted")?;
    let actual_col = column("actual")?;

    let mut records = Vec::new();
    // Blank lines are skipped by the reader, so line numbers come from it.
    let mut lines = Vec::new();
    for row in reader.records() {
        let row = row?;
        lines.push(row.position().map(|p| p.line() as usize));
        let field = |i: usize| row.get(i).filter(|s| !s.is_empty());
        records.push(ForecastPointRecord {
            timestamp: field(ts_col).map(str::to_string),
            predicted: field(predicted_col).map(|s| RawNumber::Text(s.to_string())),
            actual: field(actual_col).map(|s| RawNumber::Text(s.to_string())),
        });
    }

    ForecastSeries::from_records(&records).map_err(|source| CsvIngestError::Malformed {
        row: lines
            .get(source.index)
            .copied()
            .flatten()
            .unwrap_or(source.index + 2),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Defect, SeriesField};

    #[test]
    fn parses_in_any_column_order_and_case() {
        let src = "Actual,notes,TIMESTAMP,Predicted\n100,ok,2024-01-01,120\n50,,2024-01-02,50\n";
        let s = parse_series_csv_str(src).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.points()[0].predicted, 120.0);
        assert_eq!(s.points()[0].actual, 100.0);
        assert_eq!(s.points()[1].actual, 50.0);
    }

    #[test]
    fn empty_input_is_empty_series() {
        assert!(parse_series_csv_str("").unwrap().is_empty());
        assert!(parse_series_csv_str("timestamp,predicted,actual\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_series_csv_str("timestamp,predicted\n2024-01-01,1\n").unwrap_err();
        assert!(matches!(err, CsvIngestError::MissingHeader("actual")));
    }

    #[test]
    fn blank_cell_rejects_whole_file_with_line_number() {
        let src = "timestamp,predicted,actual\n2024-01-01,1,1\n2024-01-02,,1\n";
        match parse_series_csv_str(src).unwrap_err() {
            CsvIngestError::Malformed { row, source } => {
                assert_eq!(row, 3);
                assert_eq!(source.field, SeriesField::Predicted);
                assert_eq!(source.defect, Defect::Missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn line_number_accounts_for_blank_lines() {
        let src = "timestamp,predicted,actual\n\n\n2024-01-01,1,1\n\n2024-01-02,,1\n";
        match parse_series_csv_str(src).unwrap_err() {
            CsvIngestError::Malformed { row, source } => {
                assert_eq!(row, 6);
                assert_eq!(source.index, 1);
                assert_eq!(source.field, SeriesField::Predicted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_row_counts_as_missing_fields() {
        let src = "timestamp,predicted,actual\n2024-01-01,1\n";
        let err = parse_series_csv_str(src).unwrap_err();
        assert!(matches!(err, CsvIngestError::Malformed { row: 2, .. }));
    }
}

//! CSV reader for per-state historical feature tables.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::error::ForecastError;
use crate::features::FeatureVector;
use crate::series::{HistoricalSeries, SeriesRecord};

const DATE_COLUMN: &str = "date";
const LOAD_COLUMN: &str = "load";

/// Errors raised while reading a feature table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("cannot open \"{path}\": {source}")]
    Open { path: String, source: io::Error },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing column `{0}`")]
    MissingColumn(&'static str),

    #[error("line {line}: cannot parse `{column}` value \"{value}\"")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Series(#[from] ForecastError),
}

/// Reads a feature table with columns `date,load,<features…>`.
///
/// Every column other than `date` and `load` becomes a feature, in header
/// order. Dates are `YYYY-MM-DD`, optionally followed by ` HH:MM:SS`.
///
/// # Errors
///
/// Returns a [`TableError`] if the CSV is malformed, a required column is
/// missing, a value does not parse, or the rows violate the
/// [`HistoricalSeries`] invariants.
pub fn read_series(reader: impl Read) -> Result<HistoricalSeries, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let date_idx = column_index(&headers, DATE_COLUMN)?;
    let load_idx = column_index(&headers, LOAD_COLUMN)?;
    let feature_cols: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx && *i != load_idx)
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let line = row.position().map_or(0, csv::Position::line);
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let date = parse_date(field(date_idx)).ok_or_else(|| TableError::Parse {
            line,
            column: DATE_COLUMN.to_string(),
            value: field(date_idx).to_string(),
        })?;
        let load = parse_number(field(load_idx), line, LOAD_COLUMN)?;

        let mut features = FeatureVector::new();
        for &(idx, name) in &feature_cols {
            features.set(name, parse_number(field(idx), line, name)?);
        }
        records.push(SeriesRecord {
            date,
            load,
            features,
        });
    }

    Ok(HistoricalSeries::new(records)?)
}

/// Reads a feature table from `path`.
///
/// # Errors
///
/// Returns [`TableError::Open`] if the file cannot be opened, otherwise the
/// errors of [`read_series`].
pub fn read_series_path(path: &Path) -> Result<HistoricalSeries, TableError> {
    let file = File::open(path).map_err(|source| TableError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_series(io::BufReader::new(file))
}

fn column_index(headers: &csv::StringRecord, name: &'static str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or(TableError::MissingColumn(name))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .ok()
}

fn parse_number(s: &str, line: u64, column: &str) -> Result<f64, TableError> {
    s.parse::<f64>().map_err(|_| TableError::Parse {
        line,
        column: column.to_string(),
        value: s.to_string(),
    })
}

//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Datelike, NaiveDate};

use load_forecast::ModelError;
use load_forecast::features::FeatureVector;
use load_forecast::model::ForecastModel;
use load_forecast::series::{HistoricalSeries, SeriesRecord};

/// `2024-01-<day>`.
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Ten days ending 2024-01-10. Actual load on day `d` is `90 + d`; the last
/// row carries `lag_1=98, lag_7=90, rolling_mean_7=95`.
pub fn example_series() -> HistoricalSeries {
    let records = (1..=10)
        .map(|d| {
            let date = jan(d);
            let (lag_1, lag_7, rolling) = if d == 10 {
                (98.0, 90.0, 95.0)
            } else {
                (89.0 + f64::from(d), 83.0 + f64::from(d), 87.0 + f64::from(d))
            };
            SeriesRecord {
                date,
                load: 90.0 + f64::from(d),
                features: FeatureVector::from_pairs([
                    ("lag_1", lag_1),
                    ("lag_7", lag_7),
                    ("rolling_mean_7", rolling),
                    ("day", f64::from(date.day())),
                    ("month", f64::from(date.month())),
                    ("weekday", f64::from(date.weekday().num_days_from_monday())),
                ]),
            }
        })
        .collect();
    HistoricalSeries::new(records).unwrap()
}

/// Predicts `lag_1 + 1`.
pub struct LagPlusOne;

impl ForecastModel for LagPlusOne {
    fn name(&self) -> &str {
        "lag_plus_one"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        features
            .get("lag_1")
            .map(|lag_1| lag_1 + 1.0)
            .ok_or_else(|| ModelError::Rejected("missing lag_1".into()))
    }
}

/// Predicts `lag_1` until its `nan_at`-th call (0-based), then NaN.
pub struct NanOnCall {
    calls: AtomicUsize,
    nan_at: usize,
}

impl NanOnCall {
    pub fn new(nan_at: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            nan_at,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ForecastModel for NanOnCall {
    fn name(&self) -> &str {
        "nan_on_call"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call == self.nan_at {
            return Ok(f64::NAN);
        }
        Ok(features.get("lag_1").unwrap_or_default())
    }
}

/// Knows the true series: maps the calendar day of the input vector to the
/// actual load on the following day.
pub struct Oracle {
    next_load: BTreeMap<(u32, u32), f64>,
}

impl Oracle {
    /// The series must span less than a year so `(month, day)` is unique.
    pub fn new(series: &HistoricalSeries) -> Self {
        let next_load = series
            .records()
            .windows(2)
            .map(|w| ((w[0].date.month(), w[0].date.day()), w[1].load))
            .collect();
        Self { next_load }
    }
}

impl ForecastModel for Oracle {
    fn name(&self) -> &str {
        "oracle"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let month = features.get("month").unwrap_or_default() as u32;
        let day = features.get("day").unwrap_or_default() as u32;
        self.next_load
            .get(&(month, day))
            .copied()
            .ok_or_else(|| ModelError::Rejected(format!("no load after {month}-{day}")))
    }
}

/// Fresh, empty scratch directory unique to this test process and `name`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "load-forecast-{}-{name}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Renders a series as a feature table CSV, optionally renaming the
/// weekday column.
pub fn series_to_csv(series: &HistoricalSeries, weekday_column: &str) -> String {
    let names: Vec<&str> = series
        .schema()
        .names()
        .iter()
        .map(|n| if n == "weekday" { weekday_column } else { n.as_str() })
        .collect();
    let mut out = format!("date,load,{}\n", names.join(","));
    for r in series.records() {
        let values: Vec<String> = r.features.values().map(|v| v.to_string()).collect();
        out.push_str(&format!("{},{},{}\n", r.date, r.load, values.join(",")));
    }
    out
}

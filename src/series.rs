//! Read-only historical feature table for one state.

use chrono::NaiveDate;

use crate::error::ForecastError;
use crate::features::{FeatureSchema, FeatureVector};

/// One row of the historical table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub date: NaiveDate,
    /// Actual load on `date`.
    pub load: f64,
    /// Features used to predict the load on `date`.
    pub features: FeatureVector,
}

/// Historical records ordered by strictly increasing date.
///
/// Every record carries the same feature names in the same order; that
/// field set is exposed as the [`FeatureSchema`] the model was trained on.
/// Calendar gaps are not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    records: Vec<SeriesRecord>,
    schema: FeatureSchema,
}

impl HistoricalSeries {
    /// Validates and wraps `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidSeries`] if `records` is empty, dates
    /// are not strictly increasing, a load or feature value is not finite,
    /// the feature field set differs between records, or a required feature
    /// is missing.
    pub fn new(records: Vec<SeriesRecord>) -> Result<Self, ForecastError> {
        let first = records
            .first()
            .ok_or_else(|| ForecastError::InvalidSeries("series is empty".into()))?;
        let schema = FeatureSchema::from_vector(&first.features)
            .map_err(|e| ForecastError::InvalidSeries(format!("{}: {e}", first.date)))?;

        for record in &records {
            if !record.load.is_finite() {
                return Err(ForecastError::InvalidSeries(format!(
                    "load on {} is not finite ({})",
                    record.date, record.load
                )));
            }
            if let Some((name, value)) = record.features.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ForecastError::InvalidSeries(format!(
                    "feature `{name}` on {} is not finite ({value})",
                    record.date
                )));
            }
            if !schema.matches(&record.features) {
                return Err(ForecastError::InvalidSeries(format!(
                    "features on {} differ from the table schema [{}]",
                    record.date,
                    schema.names().join(", ")
                )));
            }
        }
        if let Some(pair) = records.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::InvalidSeries(format!(
                "dates must be strictly increasing: {} follows {}",
                pair[1].date, pair[0].date
            )));
        }

        Ok(Self { records, schema })
    }

    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent record.
    pub fn last(&self) -> &SeriesRecord {
        // Non-empty by construction.
        &self.records[self.records.len() - 1]
    }

    pub fn first_date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last().date
    }

    /// Actual load on `date`, if the table has a record for it.
    pub fn load_on(&self, date: NaiveDate) -> Option<f64> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| self.records[i].load)
    }

    /// Splits off the last `n` records, returning `(head, tail)`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidSeries`] if fewer than one record
    /// would remain in the head.
    pub fn split_last(&self, n: usize) -> Result<(HistoricalSeries, Vec<SeriesRecord>), ForecastError> {
        if n >= self.records.len() {
            return Err(ForecastError::InvalidSeries(format!(
                "cannot hold out {n} of {} records",
                self.records.len()
            )));
        }
        let split = self.records.len() - n;
        let head = Self {
            records: self.records[..split].to_vec(),
            schema: self.schema.clone(),
        };
        Ok((head, self.records[split..].to_vec()))
    }
}

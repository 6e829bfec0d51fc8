use chrono::{Datelike, Days, NaiveDate};

use super::vector::{
    DAY, FeatureSchema, FeatureVector, LAG_1, LAG_7, MONTH, ROLLING_MEAN_7, WEEKDAY,
};
use super::window::LoadWindow;
use crate::error::ForecastError;
use crate::series::HistoricalSeries;

/// Derives the next day's feature vector from the current one and a new
/// prediction.
///
/// Only the lag, rolling-mean and calendar fields change. Every other field
/// is carried forward verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureUpdater {
    weekday_field: &'static str,
}

impl Default for FeatureUpdater {
    fn default() -> Self {
        Self {
            weekday_field: WEEKDAY,
        }
    }
}

impl FeatureUpdater {
    /// Creates an updater writing calendar fields under the schema's names.
    pub fn for_schema(schema: &FeatureSchema) -> Self {
        Self {
            weekday_field: schema.weekday_field(),
        }
    }

    /// Computes the vector for `previous_date + 1 day`.
    ///
    /// `lag_7` comes from the actual historical load when `next_date - 7`
    /// is inside the historical table, otherwise from `window`. For a table
    /// without gaps that means the vectors built after the first 7
    /// predictions read actual loads and later ones read predictions.
    ///
    /// `rolling_mean_7` is blended as `(old * 6 + prediction) / 7`. This is
    /// not a true trailing mean; the two diverge after the first step.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidState`] if `previous` lacks a required
    /// field or no load is known for the `lag_7` date.
    pub fn advance(
        &self,
        previous: &FeatureVector,
        previous_date: NaiveDate,
        prediction: f64,
        history: &HistoricalSeries,
        window: &LoadWindow,
    ) -> Result<FeatureVector, ForecastError> {
        for name in [LAG_1, LAG_7, DAY, MONTH, self.weekday_field] {
            previous.require(name)?;
        }
        let previous_mean = previous.require(ROLLING_MEAN_7)?;

        let next_date = previous_date.succ_opt().ok_or_else(|| {
            ForecastError::InvalidState(format!("no calendar day after {previous_date}"))
        })?;
        let lag_7_date = next_date
            .checked_sub_days(Days::new(7))
            .ok_or_else(|| {
                ForecastError::InvalidState(format!("no calendar day 7 days before {next_date}"))
            })?;

        let lag_7 = history
            .load_on(lag_7_date)
            .or_else(|| window.load_on(lag_7_date))
            .ok_or_else(|| {
                ForecastError::InvalidState(format!("no load known for {lag_7_date} (lag_7)"))
            })?;

        let mut next = previous.clone();
        next.set(LAG_1, prediction);
        next.set(LAG_7, lag_7);
        next.set(ROLLING_MEAN_7, (previous_mean * 6.0 + prediction) / 7.0);
        next.set(DAY, f64::from(next_date.day()));
        next.set(MONTH, f64::from(next_date.month()));
        next.set(
            self.weekday_field,
            f64::from(next_date.weekday().num_days_from_monday()),
        );
        Ok(next)
    }
}

//! Holdout evaluation of the recursive forecaster.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::ForecastError;
use crate::forecast::{ForecastStep, RecursiveForecaster};
use crate::model::ForecastModel;
use crate::series::HistoricalSeries;

/// Accuracy metrics over paired actual and predicted loads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean absolute error (MW).
    pub mae: f64,
    /// Root-mean-square error (MW).
    pub rmse: f64,
    /// Coefficient of determination. Zero when the actuals have no variance.
    pub r2: f64,
    /// Largest absolute error (MW).
    pub max_abs_error: f64,
    /// Number of pairs scored.
    pub count: usize,
}

impl ForecastAccuracy {
    /// Computes accuracy metrics from `(actual, predicted)` pairs.
    ///
    /// # Arguments
    ///
    /// * `pairs` - Actual and predicted load for each day
    ///
    /// # Returns
    ///
    /// A `ForecastAccuracy` with all fields zero if `pairs` is empty.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        if pairs.is_empty() {
            return Self {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
                max_abs_error: 0.0,
                count: 0,
            };
        }

        let n = pairs.len() as f64;
        let mean_actual = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut tot_sum = 0.0;
        let mut max_abs = 0.0_f64;

        for &(actual, predicted) in pairs {
            let err = actual - predicted;
            abs_sum += err.abs();
            sq_sum += err * err;
            tot_sum += (actual - mean_actual).powi(2);
            max_abs = max_abs.max(err.abs());
        }

        let r2 = if tot_sum > 0.0 { 1.0 - sq_sum / tot_sum } else { 0.0 };

        Self {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            r2,
            max_abs_error: max_abs,
            count: pairs.len(),
        }
    }
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Forecast Accuracy ---")?;
        writeln!(f, "Days scored:     {}", self.count)?;
        writeln!(f, "MAE:             {:.3} MW", self.mae)?;
        writeln!(f, "RMSE:            {:.3} MW", self.rmse)?;
        writeln!(f, "R^2:             {:.4}", self.r2)?;
        write!(f, "Max abs error:   {:.3} MW", self.max_abs_error)
    }
}

/// Result of forecasting a held-out tail of the history.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub model: String,
    pub holdout_days: usize,
    pub accuracy: ForecastAccuracy,
    /// Recursive trajectory over the holdout period.
    pub steps: Vec<ForecastStep>,
    /// Actual loads over the holdout period, aligned with `steps`.
    pub actuals: Vec<f64>,
}

/// Holds out the last `holdout_days` records, forecasts them recursively from
/// the remaining history, and scores the trajectory against the actuals.
///
/// Holdout days missing from the trajectory's dates (calendar gaps in the
/// table) are skipped when scoring.
///
/// # Errors
///
/// Returns [`ForecastError::InvalidHorizon`] if `holdout_days` is zero,
/// [`ForecastError::InvalidSeries`] if the history is too short to split,
/// otherwise any error of [`RecursiveForecaster::forecast`].
pub fn backtest(
    forecaster: &RecursiveForecaster,
    series: &HistoricalSeries,
    model: &dyn ForecastModel,
    holdout_days: usize,
) -> Result<BacktestReport, ForecastError> {
    if holdout_days == 0 {
        return Err(ForecastError::InvalidHorizon(
            "holdout must be at least 1 day".into(),
        ));
    }
    let (head, tail) = series.split_last(holdout_days)?;
    let target = tail
        .last()
        .map(|r| r.date)
        .ok_or_else(|| ForecastError::InvalidSeries("empty holdout".into()))?;

    let trajectory = forecaster.forecast(&head, model, target)?;

    let mut steps = Vec::with_capacity(tail.len());
    let mut actuals = Vec::with_capacity(tail.len());
    for record in &tail {
        if let Some(step) = trajectory.iter().find(|s| s.date == record.date) {
            steps.push(step.clone());
            actuals.push(record.load);
        }
    }

    let pairs: Vec<(f64, f64)> = actuals
        .iter()
        .zip(&steps)
        .map(|(&a, s)| (a, s.predicted_load))
        .collect();
    let accuracy = ForecastAccuracy::from_pairs(&pairs);
    info!(
        model = model.name(),
        holdout_days,
        mae = accuracy.mae,
        rmse = accuracy.rmse,
        "backtest complete"
    );

    Ok(BacktestReport {
        model: model.name().to_string(),
        holdout_days,
        accuracy,
        steps,
        actuals,
    })
}

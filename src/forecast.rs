//! Recursive multi-step forecasting.
//!
//! The forecaster predicts one day ahead, feeds the prediction back into the
//! lag, rolling-mean and calendar features, and repeats until the target
//! date. Forecast error compounds with horizon length; no smoothing or
//! clamping is applied.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, ForecastError};
use crate::features::{FeatureUpdater, FeatureVector, LAG_WINDOW_DAYS, LoadWindow};
use crate::model::ForecastModel;
use crate::registry::{StateModelRegistry, normalize_state_name};
use crate::series::HistoricalSeries;

/// Output of one recursion iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastStep {
    /// Day this prediction is for.
    pub date: NaiveDate,
    pub predicted_load: f64,
    /// Features derived after this prediction; the input of the next step.
    pub features: FeatureVector,
}

impl fmt::Display for ForecastStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | load={:>10.2}", self.date, self.predicted_load)?;
        for (name, value) in self.features.iter() {
            write!(f, "  {name}={value:.2}")?;
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, checked once per iteration.
///
/// Clones share the same flag, so one clone can be handed to a controlling
/// thread while another is attached to a [`RecursiveForecaster`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How far ahead to forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    /// Forecast up to and including this date.
    Until(NaiveDate),
    /// Forecast this many days past the last historical date.
    Days(usize),
}

impl Horizon {
    /// Resolves the horizon to a target date relative to `last_date`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidHorizon`] for zero days or a date
    /// beyond the calendar range.
    pub fn target_date(self, last_date: NaiveDate) -> Result<NaiveDate, ForecastError> {
        match self {
            Self::Until(date) => Ok(date),
            Self::Days(0) => Err(ForecastError::InvalidHorizon(
                "horizon must be at least 1 day".into(),
            )),
            Self::Days(days) => last_date
                .checked_add_days(Days::new(days as u64))
                .ok_or_else(|| {
                    ForecastError::InvalidHorizon(format!("{days} days after {last_date} is out of range"))
                }),
        }
    }
}

/// Forecast for one state, as resolved through a registry.
#[derive(Debug, Clone, Serialize)]
pub struct StateForecast {
    pub state: String,
    pub model: String,
    pub last_date: NaiveDate,
    pub last_load: f64,
    pub steps: Vec<ForecastStep>,
}

/// Drives the day-by-day recursion from the last known state to a target date.
///
/// Holds only call-independent settings; each call owns its own feature
/// state, so one forecaster can serve concurrent calls.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use load_forecast::forecast::RecursiveForecaster;
/// use load_forecast::model::PersistenceModel;
/// use load_forecast::synthetic::SyntheticLoad;
///
/// let series = SyntheticLoad::new(300.0, 20.0, 40.0, 5.0, 7)
///     .feature_table(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 60)
///     .unwrap();
/// let target = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
///
/// let steps = RecursiveForecaster::new()
///     .forecast(&series, &PersistenceModel, target)
///     .unwrap();
/// assert_eq!(steps.last().map(|s| s.date), Some(target));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecursiveForecaster {
    max_horizon_days: Option<usize>,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl RecursiveForecaster {
    /// Creates a forecaster with no horizon limit, timeout or cancel token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects horizons longer than `days`.
    pub fn with_max_horizon(mut self, days: usize) -> Self {
        self.max_horizon_days = Some(days);
        self
    }

    /// Aborts a call that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Aborts calls once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of days between the series' last date and `target_date`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidHorizon`] if `target_date` is not
    /// strictly after the last date or exceeds the configured maximum.
    pub fn horizon_days(
        &self,
        series: &HistoricalSeries,
        target_date: NaiveDate,
    ) -> Result<usize, ForecastError> {
        let last_date = series.last_date();
        let days = (target_date - last_date).num_days();
        if days < 1 {
            return Err(ForecastError::InvalidHorizon(format!(
                "target {target_date} is not after last historical date {last_date}"
            )));
        }
        let days = usize::try_from(days)
            .map_err(|_| ForecastError::InvalidHorizon(format!("{days} days is out of range")))?;
        if let Some(max) = self.max_horizon_days.filter(|max| days > *max) {
            return Err(ForecastError::InvalidHorizon(format!(
                "{days} days exceeds the maximum horizon of {max} days"
            )));
        }
        Ok(days)
    }

    /// Forecasts every day from the day after the series' last date up to
    /// and including `target_date`.
    ///
    /// Returns one [`ForecastStep`] per day, in date order.
    ///
    /// # Errors
    ///
    /// * [`ForecastError::InvalidHorizon`] - target not strictly after the last date
    /// * [`ForecastError::InsufficientHistory`] - fewer than 7 historical records
    /// * [`ForecastError::ModelInference`] - model error or non-finite prediction
    /// * [`ForecastError::InvalidState`] - a feature vector lost a required field
    /// * [`ForecastError::Cancelled`] - cancel token set or timeout elapsed
    ///
    /// Any error discards the whole trajectory.
    pub fn forecast(
        &self,
        series: &HistoricalSeries,
        model: &dyn ForecastModel,
        target_date: NaiveDate,
    ) -> Result<Vec<ForecastStep>, ForecastError> {
        self.run(series, model, target_date)
            .inspect_err(|e| warn!(model = model.name(), %target_date, error = %e, "forecast aborted"))
    }

    /// Forecasts `days` days past the series' last date.
    ///
    /// # Errors
    ///
    /// Same as [`forecast`](Self::forecast); zero days is an invalid horizon.
    pub fn forecast_days(
        &self,
        series: &HistoricalSeries,
        model: &dyn ForecastModel,
        days: usize,
    ) -> Result<Vec<ForecastStep>, ForecastError> {
        let target_date = Horizon::Days(days).target_date(series.last_date())?;
        self.forecast(series, model, target_date)
    }

    /// Resolves `state_id` through `registry` and forecasts it.
    ///
    /// The returned forecast carries the normalized state name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] if the state cannot be resolved and
    /// [`Error::Forecast`] if the forecast itself fails.
    pub fn forecast_state(
        &self,
        registry: &dyn StateModelRegistry,
        state_id: &str,
        horizon: Horizon,
    ) -> Result<StateForecast, Error> {
        let (model, series) = registry.resolve(state_id)?;
        let last = series.last();
        let target_date = horizon.target_date(last.date)?;
        let steps = self.forecast(&series, model.as_ref(), target_date)?;
        Ok(StateForecast {
            state: normalize_state_name(state_id).to_string(),
            model: model.name().to_string(),
            last_date: last.date,
            last_load: last.load,
            steps,
        })
    }

    fn run(
        &self,
        series: &HistoricalSeries,
        model: &dyn ForecastModel,
        target_date: NaiveDate,
    ) -> Result<Vec<ForecastStep>, ForecastError> {
        let horizon_days = self.horizon_days(series, target_date)?;
        if series.len() < LAG_WINDOW_DAYS {
            return Err(ForecastError::InsufficientHistory {
                needed: LAG_WINDOW_DAYS,
                got: series.len(),
            });
        }

        let updater = FeatureUpdater::for_schema(series.schema());
        let mut window = LoadWindow::seeded(series)?;
        let last = series.last();
        let mut current = last.features.clone();
        let mut current_date = last.date;
        let started = Instant::now();

        info!(
            model = model.name(),
            last_date = %current_date,
            %target_date,
            horizon_days,
            "starting recursive forecast"
        );

        let mut steps = Vec::with_capacity(horizon_days);
        while steps.len() < horizon_days {
            self.check_cancelled(started, steps.len(), horizon_days)?;

            let next_date = current_date.succ_opt().ok_or_else(|| {
                ForecastError::InvalidHorizon(format!("no calendar day after {current_date}"))
            })?;
            let prediction = model
                .predict(&current)
                .map_err(|e| ForecastError::ModelInference {
                    date: next_date,
                    reason: e.to_string(),
                })?;
            if !prediction.is_finite() {
                return Err(ForecastError::ModelInference {
                    date: next_date,
                    reason: format!("non-finite prediction ({prediction})"),
                });
            }

            current = updater.advance(&current, current_date, prediction, series, &window)?;
            debug_assert!(series.schema().matches(&current));
            window.push(next_date, prediction);
            current_date = next_date;

            debug!(date = %current_date, prediction, "forecast step");
            steps.push(ForecastStep {
                date: current_date,
                predicted_load: prediction,
                features: current.clone(),
            });
        }

        Ok(steps)
    }

    fn check_cancelled(
        &self,
        started: Instant,
        completed_steps: usize,
        horizon_days: usize,
    ) -> Result<(), ForecastError> {
        let cancelled = self.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
        let timed_out = self.timeout.is_some_and(|t| started.elapsed() > t);
        if cancelled || timed_out {
            return Err(ForecastError::Cancelled {
                completed_steps,
                horizon_days,
            });
        }
        Ok(())
    }
}

//! Error types for the forecasting engine and its collaborators.

use chrono::NaiveDate;
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors that abort a single forecasting call.
///
/// Every variant is unrecoverable for the call that produced it: the whole
/// trajectory is discarded and no partial result is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Target date is not strictly after the last historical date, or the
    /// horizon exceeds the configured maximum.
    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    /// A feature vector is missing a field the updater needs.
    #[error("invalid feature state: {0}")]
    InvalidState(String),

    /// The model rejected its input or produced a non-finite prediction.
    #[error("model inference failed for {date}: {reason}")]
    ModelInference { date: NaiveDate, reason: String },

    /// The series is too short to seed the lag window.
    #[error("insufficient history: need at least {needed} records, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// The historical series violates an ordering or schema invariant.
    #[error("invalid series: {0}")]
    InvalidSeries(String),

    /// Cancelled by the caller or stopped by the configured timeout.
    #[error("forecast cancelled after {completed_steps} of {horizon_days} steps")]
    Cancelled {
        completed_steps: usize,
        horizon_days: usize,
    },
}

/// Failure of a registry-backed forecast: either the state could not be
/// resolved or the forecast itself failed.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

/// Errors returned by a [`ForecastModel`](crate::model::ForecastModel).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The feature vector does not carry the field set the model was fitted on.
    #[error("feature mismatch: expected [{expected}], got [{got}]")]
    FeatureMismatch { expected: String, got: String },

    /// Any other refusal by the wrapped regressor.
    #[error("{0}")]
    Rejected(String),
}

//! Recursive multi-step electricity load forecasting for Indian states.

#[cfg(feature = "api")]
pub mod api;
pub mod backtest;
pub mod config;
pub mod error;
/// Feature vectors, the lag window and the day-to-day feature updater.
pub mod features;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod model;
pub mod registry;
pub mod series;
pub mod synthetic;

pub use error::{Error, ForecastError, ModelError};

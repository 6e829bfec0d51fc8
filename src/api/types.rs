//! API query and response types.
//!
//! Forecast responses serialize [`StateForecast`](crate::forecast::StateForecast)
//! directly, so the JSON field names match the CSV export columns.

use serde::{Deserialize, Serialize};

/// Query parameters of `GET /forecast`.
///
/// At most one of `target` and `days` may be given; with neither, the
/// configured default horizon applies.
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// State name, short or full (e.g. `UP` or `Uttar Pradesh`).
    pub state: String,
    /// Last day to forecast, `YYYY-MM-DD`.
    pub target: Option<String>,
    /// Number of days past the last historical date.
    pub days: Option<usize>,
}

/// Body of `GET /states`.
#[derive(Debug, Serialize)]
pub struct StatesResponse {
    pub states: Vec<String>,
}

/// Error response body for 4xx and 5xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

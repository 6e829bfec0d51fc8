//! Read-only REST API over a state registry.
//!
//! Provides two GET endpoints:
//! - `/states`: names of all forecastable states
//! - `/forecast?state=<s>&target=<YYYY-MM-DD>` or `&days=<n>`: recursive
//!   forecast for one state

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::forecast::RecursiveForecaster;
use crate::registry::StateModelRegistry;

pub use types::{ErrorResponse, ForecastQuery, StatesResponse};

/// Application state shared across all request handlers.
///
/// The registry and forecaster are read-only, so no locks are needed; each
/// request resolves its own model and feature state.
pub struct AppState {
    /// Source of per-state models and feature tables.
    pub registry: Arc<dyn StateModelRegistry>,
    /// Forecaster carrying the configured horizon limit and timeout.
    pub forecaster: RecursiveForecaster,
    /// Horizon used when a request gives neither `target` nor `days`.
    pub default_days: usize,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/states", get(handlers::get_states))
        .route("/forecast", get(handlers::get_forecast))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the TCP listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}

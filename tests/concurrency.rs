//! Concurrent forecasts and cooperative cancellation.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::{example_series, jan};
use load_forecast::ForecastError;
use load_forecast::ModelError;
use load_forecast::features::FeatureVector;
use load_forecast::forecast::{CancelToken, Horizon, RecursiveForecaster};
use load_forecast::model::ForecastModel;
use load_forecast::registry::StateModelRegistry;
use load_forecast::synthetic::SyntheticRegistry;

#[test]
fn parallel_state_forecasts_match_sequential() {
    let registry: Arc<dyn StateModelRegistry> = Arc::new(SyntheticRegistry::demo(7));
    let forecaster = Arc::new(RecursiveForecaster::new());
    let states = registry.states().unwrap();

    let sequential: Vec<_> = states
        .iter()
        .map(|s| {
            forecaster
                .forecast_state(registry.as_ref(), s, Horizon::Days(60))
                .unwrap()
                .steps
        })
        .collect();

    let handles: Vec<_> = states
        .iter()
        .cloned()
        .map(|state| {
            let registry = Arc::clone(&registry);
            let forecaster = Arc::clone(&forecaster);
            thread::spawn(move || {
                forecaster
                    .forecast_state(registry.as_ref(), &state, Horizon::Days(60))
                    .unwrap()
                    .steps
            })
        })
        .collect();
    let parallel: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(parallel, sequential);
}

/// Persistence model that cancels `token` on its `cancel_at`-th call.
struct CancellingModel {
    token: CancelToken,
    calls: AtomicUsize,
    cancel_at: usize,
}

impl ForecastModel for CancellingModel {
    fn name(&self) -> &str {
        "cancelling"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if self.calls.fetch_add(1, Ordering::Relaxed) == self.cancel_at {
            self.token.cancel();
        }
        Ok(features.get("lag_1").unwrap_or_default())
    }
}

#[test]
fn cancellation_is_checked_between_steps() {
    let token = CancelToken::new();
    let model = CancellingModel {
        token: token.clone(),
        calls: AtomicUsize::new(0),
        cancel_at: 4,
    };
    let err = RecursiveForecaster::new()
        .with_cancel_token(token)
        .forecast(&example_series(), &model, jan(31))
        .unwrap_err();

    // The step during which the token flipped still completes.
    assert_eq!(
        err,
        ForecastError::Cancelled {
            completed_steps: 5,
            horizon_days: 21
        }
    );
}

#[test]
fn token_cancelled_from_another_thread() {
    let token = CancelToken::new();
    let remote = token.clone();
    thread::spawn(move || remote.cancel()).join().unwrap();

    assert!(token.is_cancelled());
    let err = RecursiveForecaster::new()
        .with_cancel_token(token)
        .forecast(&example_series(), &common::LagPlusOne, jan(12))
        .unwrap_err();
    assert!(matches!(err, ForecastError::Cancelled { completed_steps: 0, .. }));
}

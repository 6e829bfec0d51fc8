//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use load_forecast::api::{AppState, router};
use load_forecast::config::ForecastConfig;
use load_forecast::synthetic::SyntheticRegistry;

/// API state over the demo registry with the default configuration.
fn build_api_state() -> Arc<AppState> {
    let cfg = ForecastConfig::default();
    Arc::new(AppState {
        registry: Arc::new(SyntheticRegistry::demo(cfg.data.demo_seed)),
        forecaster: cfg.forecaster(),
        default_days: cfg.forecast.default_days,
    })
}

async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
    let app = router(build_api_state());
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn demo_states_endpoint() {
    let (status, json) = get_json("/states").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["states"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn demo_forecast_chains_lag_1() {
    let (status, json) = get_json("/forecast?state=MP&days=1").await;
    // Madhya Pradesh is not a demo state.
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, json) = get_json("/forecast?state=Gujarat&days=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["last_date"], "2023-12-31");
    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 10);
    for step in steps {
        assert_eq!(step["features"]["lag_1"], step["predicted_load"]);
    }
    // Demo model: 0.5 * lag_1 + 0.3 * lag_7 + 0.2 * rolling_mean_7.
    let value = |v: &serde_json::Value| v.as_f64().unwrap();
    for pair in steps.windows(2) {
        let f = &pair[0]["features"];
        let expected = 0.5 * value(&f["lag_1"])
            + 0.3 * value(&f["lag_7"])
            + 0.2 * value(&f["rolling_mean_7"]);
        assert!((value(&pair[1]["predicted_load"]) - expected).abs() < 1e-6);
    }
}

#[tokio::test]
async fn horizon_beyond_config_limit_is_rejected() {
    let (status, json) = get_json("/forecast?state=Bihar&days=366").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .is_some_and(|e| e.contains("exceeds the maximum horizon"))
    );
}

//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;

use super::AppState;
use super::types::{ErrorResponse, ForecastQuery, StatesResponse};
use crate::error::{Error, ForecastError};
use crate::forecast::{Horizon, StateForecast};
use crate::registry::RegistryError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Returns the names of all forecastable states.
///
/// `GET /states` → 200 + `StatesResponse` JSON
/// Registry listing failure → 500 + `ErrorResponse`
pub async fn get_states(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatesResponse>, ApiError> {
    state
        .registry
        .states()
        .map(|states| Json(StatesResponse { states }))
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Runs a recursive forecast for one state.
///
/// `GET /forecast?state=UP&days=7` → 200 + `StateForecast` JSON
/// `GET /forecast?state=UP&target=2024-01-17` → same, up to the target date
/// Both `target` and `days`, a bad date or an invalid horizon → 400
/// Unknown state → 404, model or table failure → 422, timeout → 503
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<StateForecast>, ApiError> {
    let horizon = parse_horizon(&query, state.default_days)?;

    // The recursion is CPU-bound; keep it off the async workers.
    let task_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        task_state
            .forecaster
            .forecast_state(task_state.registry.as_ref(), &query.state, horizon)
    })
    .await
    .map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("forecast task failed: {e}"),
        )
    })?;

    result
        .map(Json)
        .map_err(|e| error_response(status_for(&e), e.to_string()))
}

fn parse_horizon(query: &ForecastQuery, default_days: usize) -> Result<Horizon, ApiError> {
    match (&query.target, query.days) {
        (Some(_), Some(_)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "give either `target` or `days`, not both",
        )),
        (Some(target), None) => NaiveDate::parse_from_str(target, "%Y-%m-%d")
            .map(Horizon::Until)
            .map_err(|_| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("`target` \"{target}\" is not a YYYY-MM-DD date"),
                )
            }),
        (None, Some(days)) => Ok(Horizon::Days(days)),
        (None, None) => Ok(Horizon::Days(default_days)),
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Registry(RegistryError::UnknownState(_) | RegistryError::ModelNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        Error::Registry(RegistryError::Table { .. } | RegistryError::ModelFile { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Registry(RegistryError::List { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Forecast(ForecastError::InvalidHorizon(_)) => StatusCode::BAD_REQUEST,
        Error::Forecast(ForecastError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Forecast(
            ForecastError::ModelInference { .. }
            | ForecastError::InvalidState(_)
            | ForecastError::InsufficientHistory { .. }
            | ForecastError::InvalidSeries(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::forecast::RecursiveForecaster;
    use crate::model::ModelSpec;
    use crate::registry::InMemoryRegistry;
    use crate::synthetic::SyntheticLoad;

    /// Bihar has a working model; Goa's model expects a single field and
    /// rejects every vector.
    fn make_test_state() -> Arc<AppState> {
        let series = SyntheticLoad::new(250.0, 10.0, 20.0, 2.0, 5)
            .feature_table(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 31)
            .unwrap();
        let mut registry = InMemoryRegistry::new();
        registry.insert("Bihar", ModelSpec::Persistence, series.clone());
        registry.insert(
            "Goa",
            ModelSpec::Linear {
                intercept: 0.0,
                coefficients: BTreeMap::from([("lag_1".to_string(), 1.0)]),
            },
            series,
        );
        Arc::new(AppState {
            registry: Arc::new(registry),
            forecaster: RecursiveForecaster::new().with_max_horizon(30),
            default_days: 1,
        })
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn states_returns_sorted_names() {
        let (status, json) = get("/states").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["states"], serde_json::json!(["Bihar", "Goa"]));
    }

    #[tokio::test]
    async fn forecast_by_days() {
        let (status, json) = get("/forecast?state=Bihar&days=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "Bihar");
        assert_eq!(json["model"], "persistence");
        assert_eq!(json["last_date"], "2024-01-31");
        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["date"], "2024-02-01");
        assert_eq!(steps[2]["date"], "2024-02-03");
        assert!(steps[0]["features"]["lag_1"].is_number());
    }

    #[tokio::test]
    async fn forecast_by_target_date() {
        let (status, json) = get("/forecast?state=Bihar&target=2024-02-05").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["steps"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn forecast_defaults_to_one_day() {
        let (status, json) = get("/forecast?state=Bihar").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["steps"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn target_and_days_together_return_400() {
        let (status, json) = get("/forecast?state=Bihar&days=2&target=2024-02-05").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn bad_target_returns_400() {
        let (status, _) = get("/forecast?state=Bihar&target=05-02-2024").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn past_target_returns_400() {
        let (status, _) = get("/forecast?state=Bihar&target=2024-01-31").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn horizon_over_limit_returns_400() {
        let (status, _) = get("/forecast?state=Bihar&days=31").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_state_returns_404() {
        let (status, json) = get("/forecast?state=Kerala&days=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "unknown state \"Kerala\"");
    }

    #[tokio::test]
    async fn rejected_features_return_422() {
        let (status, json) = get("/forecast?state=Goa&days=2").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("model inference failed for 2024-02-01"))
        );
    }
}

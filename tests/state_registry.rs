//! Integration tests for file-backed and synthetic state registries.

mod common;

use std::fs;

use chrono::NaiveDate;

use common::{scratch_dir, series_to_csv};
use load_forecast::Error;
use load_forecast::forecast::{Horizon, RecursiveForecaster};
use load_forecast::io::export::export_csv;
use load_forecast::model::ModelSpec;
use load_forecast::registry::{DirectoryRegistry, RegistryError, StateModelRegistry};
use load_forecast::series::HistoricalSeries;
use load_forecast::synthetic::{SyntheticLoad, SyntheticRegistry};

fn synthetic_series(seed: u64) -> HistoricalSeries {
    SyntheticLoad::new(800.0, 40.0, 120.0, 10.0, seed)
        .feature_table(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 120)
        .unwrap()
}

const LINEAR_MODEL: &str = r#"
kind = "linear"
intercept = 5.0

[coefficients]
lag_1 = 0.7
lag_7 = 0.2
rolling_mean_7 = 0.1
day = 0.0
month = 0.0
weekday = 0.0
"#;

#[test]
fn directory_registry_resolves_tables_and_models() {
    let dir = scratch_dir("resolve");
    let features = dir.join("features");
    let models = dir.join("models");
    fs::create_dir_all(&features).unwrap();
    fs::create_dir_all(&models).unwrap();

    let up = synthetic_series(1);
    fs::write(
        features.join("Uttar Pradesh_features.csv"),
        series_to_csv(&up, "weekday"),
    )
    .unwrap();
    fs::write(models.join("Uttar Pradesh_model.toml"), LINEAR_MODEL).unwrap();
    fs::write(
        features.join("Kerala_features.csv"),
        series_to_csv(&synthetic_series(2), "weekday"),
    )
    .unwrap();
    fs::write(features.join("README.txt"), "not a table").unwrap();

    let registry = DirectoryRegistry::new(&features, &models).with_fallback(ModelSpec::Persistence);
    assert_eq!(
        registry.states().unwrap(),
        vec!["Kerala".to_string(), "Uttar Pradesh".to_string()]
    );

    let (model, series) = registry.resolve("UP").unwrap();
    assert_eq!(model.name(), "linear");
    assert_eq!(series, up);

    let (fallback, _) = registry.resolve("Kerala").unwrap();
    assert_eq!(fallback.name(), "persistence");

    let forecast = RecursiveForecaster::new()
        .forecast_state(&registry, "UP", Horizon::Days(14))
        .unwrap();
    assert_eq!(forecast.state, "Uttar Pradesh");
    assert_eq!(forecast.model, "linear");
    assert_eq!(forecast.steps.len(), 14);

    let out = dir.join("up.csv");
    export_csv(&forecast.steps, &out).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 15);
    assert!(written.starts_with("date,predicted_load,lag_1,lag_7,rolling_mean_7,day,month,weekday\n"));
}

#[test]
fn missing_model_without_fallback_is_reported() {
    let dir = scratch_dir("no-model");
    fs::write(
        dir.join("Goa_features.csv"),
        series_to_csv(&synthetic_series(3), "weekday"),
    )
    .unwrap();

    let registry = DirectoryRegistry::new(&dir, &dir);
    assert!(matches!(
        registry.resolve("Goa"),
        Err(RegistryError::ModelNotFound(s)) if s == "Goa"
    ));
    assert!(matches!(
        registry.resolve("Assam"),
        Err(RegistryError::UnknownState(s)) if s == "Assam"
    ));
}

#[test]
fn malformed_model_file_is_reported() {
    let dir = scratch_dir("bad-model");
    fs::write(
        dir.join("Goa_features.csv"),
        series_to_csv(&synthetic_series(3), "weekday"),
    )
    .unwrap();
    fs::write(dir.join("Goa_model.toml"), "kind = \"xgboost\"\n").unwrap();

    let registry = DirectoryRegistry::new(&dir, &dir);
    assert!(matches!(
        registry.resolve("Goa"),
        Err(RegistryError::ModelFile { state, .. }) if state == "Goa"
    ));
}

#[test]
fn day_of_week_column_is_kept_through_recursion() {
    let dir = scratch_dir("day-of-week");
    let series = synthetic_series(4);
    fs::write(
        dir.join("Punjab_features.csv"),
        series_to_csv(&series, "day_of_week"),
    )
    .unwrap();

    let registry = DirectoryRegistry::new(&dir, &dir).with_fallback(ModelSpec::Persistence);
    let forecast = RecursiveForecaster::new()
        .forecast_state(&registry, "Punjab", Horizon::Days(3))
        .unwrap();

    for step in &forecast.steps {
        assert!(step.features.get("weekday").is_none());
        let expected = f64::from(chrono::Datelike::weekday(&step.date).num_days_from_monday());
        assert_eq!(step.features.get("day_of_week"), Some(expected));
    }
}

#[test]
fn unsorted_table_is_rejected() {
    let dir = scratch_dir("unsorted");
    let csv = "date,load,lag_1,lag_7,rolling_mean_7,day,month,weekday\n\
               2024-01-02,1,1,1,1,2,1,1\n\
               2024-01-01,1,1,1,1,1,1,0\n";
    fs::write(dir.join("Goa_features.csv"), csv).unwrap();

    let registry = DirectoryRegistry::new(&dir, &dir).with_fallback(ModelSpec::Persistence);
    assert!(matches!(
        registry.resolve("Goa"),
        Err(RegistryError::Table { .. })
    ));
}

#[test]
fn unknown_state_surfaces_as_registry_error() {
    let registry = SyntheticRegistry::demo(42);
    let err = RecursiveForecaster::new()
        .forecast_state(&registry, "Atlantis", Horizon::Days(1))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Registry(RegistryError::UnknownState(ref s)) if s == "Atlantis"
    ));
    assert_eq!(err.to_string(), "unknown state \"Atlantis\"");
}

#[test]
fn demo_registry_forecasts_every_state() {
    let registry = SyntheticRegistry::demo(42);
    let forecaster = RecursiveForecaster::new().with_max_horizon(30);
    for state in registry.states().unwrap() {
        let forecast = forecaster
            .forecast_state(&registry, &state, Horizon::Days(30))
            .unwrap();
        assert_eq!(forecast.steps.len(), 30);
        assert!(forecast.steps.iter().all(|s| s.predicted_load.is_finite()));
    }
}

#[test]
fn state_ids_cannot_leave_the_features_dir() {
    let dir = scratch_dir("traversal");
    let features = dir.join("features");
    fs::create_dir_all(&features).unwrap();
    // A valid table one level above the features directory.
    fs::write(
        dir.join("secret_features.csv"),
        series_to_csv(&synthetic_series(3), "weekday"),
    )
    .unwrap();

    let registry = DirectoryRegistry::new(&features, &features).with_fallback(ModelSpec::Persistence);
    assert!(registry.states().unwrap().is_empty());
    for id in ["../secret", "..\\secret", "features/../../secret"] {
        assert!(
            matches!(registry.resolve(id), Err(RegistryError::UnknownState(_))),
            "{id} should not resolve"
        );
    }
}

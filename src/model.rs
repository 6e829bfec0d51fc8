//! Trained regressors seen by the forecaster as a single `predict` capability.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ModelError;
use crate::features::FeatureVector;
use crate::features::vector::LAG_1;

/// A trained per-state regressor.
///
/// The forecaster never inspects the concrete type. Implementations must be
/// deterministic for the recursive forecast to be reproducible.
pub trait ForecastModel: Send + Sync {
    /// Short human-readable model name.
    fn name(&self) -> &str;

    /// Predicts the load for the day described by `features`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the field set differs from the one the
    /// model was fitted on, or the model refuses the input for any other
    /// reason.
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Naive "tomorrow is today" model: predicts `lag_1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PersistenceModel;

impl ForecastModel for PersistenceModel {
    fn name(&self) -> &str {
        "persistence"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        features
            .get(LAG_1)
            .ok_or_else(|| ModelError::Rejected(format!("missing `{LAG_1}`")))
    }
}

/// Linear regressor with one coefficient per named feature.
///
/// Accepts a vector only if its field set equals the coefficient set; field
/// order does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
}

impl LinearModel {
    pub fn new(intercept: f64, coefficients: BTreeMap<String, f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &BTreeMap<String, f64> {
        &self.coefficients
    }

    fn check_fields(&self, features: &FeatureVector) -> Result<(), ModelError> {
        let same = features.len() == self.coefficients.len()
            && features.names().all(|n| self.coefficients.contains_key(n));
        if same {
            return Ok(());
        }
        let mut got: Vec<&str> = features.names().collect();
        got.sort_unstable();
        Err(ModelError::FeatureMismatch {
            expected: self
                .coefficients
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            got: got.join(", "),
        })
    }
}

impl ForecastModel for LinearModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.check_fields(features)?;
        // Sum in coefficient-key order so the result does not depend on
        // the vector's field order.
        let dot: f64 = self
            .coefficients
            .iter()
            .map(|(name, coef)| coef * features.get(name).unwrap_or_default())
            .sum();
        Ok(self.intercept + dot)
    }
}

/// On-disk model description, parsed from a `<State>_model.toml` file.
///
/// ```toml
/// kind = "linear"
/// intercept = 12.5
///
/// [coefficients]
/// lag_1 = 0.6
/// lag_7 = 0.25
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Persistence,
    Linear {
        #[serde(default)]
        intercept: f64,
        coefficients: BTreeMap<String, f64>,
    },
}

impl ModelSpec {
    /// Parses a model description from TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error message if parsing fails.
    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| e.to_string())
    }

    /// Reads and parses a model file.
    ///
    /// # Errors
    ///
    /// Returns a message naming the file if it cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read \"{}\": {e}", path.display()))?;
        Self::from_toml_str(&content).map_err(|e| format!("\"{}\": {e}", path.display()))
    }

    /// Builds a fresh model instance.
    pub fn build(&self) -> Box<dyn ForecastModel> {
        match self {
            Self::Persistence => Box::new(PersistenceModel),
            Self::Linear {
                intercept,
                coefficients,
            } => Box::new(LinearModel::new(*intercept, coefficients.clone())),
        }
    }
}

//! TOML-based forecaster configuration.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::forecast::RecursiveForecaster;
use crate::model::ModelSpec;
use crate::registry::DirectoryRegistry;

/// Top-level configuration parsed from TOML.
///
/// Every section and field has a default, so an empty file is valid. Load
/// with [`ForecastConfig::from_toml_file`] or start from
/// [`ForecastConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    /// Where feature tables and model files live.
    #[serde(default)]
    pub data: DataConfig,
    /// Forecast horizon and runtime limits.
    #[serde(default)]
    pub forecast: ForecastSection,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data locations and model fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Directory holding `<State>_features.csv` tables.
    pub features_dir: String,
    /// Directory holding `<State>_model.toml` files.
    pub models_dir: String,
    /// Model for states without a model file: `"persistence"` or `"none"`.
    pub fallback_model: String,
    /// Seed for the synthetic demo registry.
    pub demo_seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            features_dir: "data/features".to_string(),
            models_dir: "models".to_string(),
            fallback_model: "persistence".to_string(),
            demo_seed: 42,
        }
    }
}

/// Forecast horizon and runtime limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastSection {
    /// Longest accepted horizon in days (must be > 0).
    pub max_horizon_days: usize,
    /// Per-call time limit in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    /// Horizon used when neither a target date nor a day count is given.
    pub default_days: usize,
}

impl Default for ForecastSection {
    fn default() -> Self {
        Self {
            max_horizon_days: 365,
            timeout_ms: 0,
            default_days: 1,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"forecast.max_horizon_days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ForecastConfig {
    /// Accepted values of `data.fallback_model`.
    pub const FALLBACK_MODELS: &[&str] = &["persistence", "none"];

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let d = &self.data;
        if d.features_dir.trim().is_empty() {
            errors.push(ConfigError {
                field: "data.features_dir".into(),
                message: "must not be empty".into(),
            });
        }
        if !Self::FALLBACK_MODELS.contains(&d.fallback_model.as_str()) {
            errors.push(ConfigError {
                field: "data.fallback_model".into(),
                message: format!(
                    "must be \"persistence\" or \"none\", got \"{}\"",
                    d.fallback_model
                ),
            });
        }

        let f = &self.forecast;
        if f.max_horizon_days == 0 {
            errors.push(ConfigError {
                field: "forecast.max_horizon_days".into(),
                message: "must be > 0".into(),
            });
        }
        if f.default_days == 0 {
            errors.push(ConfigError {
                field: "forecast.default_days".into(),
                message: "must be > 0".into(),
            });
        }
        if f.max_horizon_days > 0 && f.default_days > f.max_horizon_days {
            errors.push(ConfigError {
                field: "forecast.default_days".into(),
                message: "must be <= forecast.max_horizon_days".into(),
            });
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.filter) {
            errors.push(ConfigError {
                field: "logging.filter".into(),
                message: e.to_string(),
            });
        }

        errors
    }

    /// Model used for states without a model file, if any.
    pub fn fallback_spec(&self) -> Option<ModelSpec> {
        match self.data.fallback_model.as_str() {
            "persistence" => Some(ModelSpec::Persistence),
            _ => None,
        }
    }

    /// Forecaster with the configured horizon limit and timeout.
    pub fn forecaster(&self) -> RecursiveForecaster {
        let forecaster =
            RecursiveForecaster::new().with_max_horizon(self.forecast.max_horizon_days);
        match self.forecast.timeout_ms {
            0 => forecaster,
            ms => forecaster.with_timeout(Duration::from_millis(ms)),
        }
    }

    /// File-backed registry over the configured directories.
    pub fn directory_registry(&self) -> DirectoryRegistry {
        let registry = DirectoryRegistry::new(&self.data.features_dir, &self.data.models_dir);
        match self.fallback_spec() {
            Some(spec) => registry.with_fallback(spec),
            None => registry,
        }
    }
}

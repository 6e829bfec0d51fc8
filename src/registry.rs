//! Resolution of a state identifier to its trained model and feature table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::io::table::{TableError, read_series_path};
use crate::model::{ForecastModel, ModelSpec};
use crate::series::HistoricalSeries;

/// File name suffix of per-state feature tables.
const FEATURES_SUFFIX: &str = "_features.csv";
/// File name suffix of per-state model files.
const MODEL_SUFFIX: &str = "_model.toml";

/// Short state names used in the raw load data, with their full names.
const STATE_NAME_MAPPING: &[(&str, &str)] = &[
    ("UP", "Uttar Pradesh"),
    ("MP", "Madhya Pradesh"),
    ("HP", "Himachal Pradesh"),
    ("J&K", "Jammu and Kashmir"),
    ("DNH", "Dadra and Nagar Haveli"),
    ("Pondy", "Puducherry"),
    ("WB", "West Bengal"),
    ("TN", "Tamil Nadu"),
    ("TS", "Telangana"),
    ("UK", "Uttarakhand"),
];

/// Maps a short state name to its full name; other names pass through.
///
/// ```
/// use load_forecast::registry::normalize_state_name;
///
/// assert_eq!(normalize_state_name("UP"), "Uttar Pradesh");
/// assert_eq!(normalize_state_name("Bihar"), "Bihar");
/// ```
pub fn normalize_state_name(raw: &str) -> &str {
    let raw = raw.trim();
    STATE_NAME_MAPPING
        .iter()
        .find(|(short, _)| *short == raw)
        .map_or(raw, |&(_, full)| full)
}

/// Errors raised while resolving a state.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown state \"{0}\"")]
    UnknownState(String),

    #[error("no model for state \"{0}\"")]
    ModelNotFound(String),

    #[error("cannot list \"{path}\": {source}")]
    List {
        path: String,
        source: std::io::Error,
    },

    #[error("feature table for \"{state}\": {source}")]
    Table { state: String, source: TableError },

    #[error("model file for \"{state}\": {message}")]
    ModelFile { state: String, message: String },
}

/// Resolves a state to a fresh model instance and its historical table.
///
/// Each call returns a new model, so concurrent forecasts for different
/// states never share one.
pub trait StateModelRegistry: Send + Sync {
    /// Names of all resolvable states, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the backing store cannot be listed.
    fn states(&self) -> Result<Vec<String>, RegistryError>;

    /// Resolves `state_id` (short or full name).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownState`] if no table exists for the
    /// state, or another [`RegistryError`] if its files cannot be loaded.
    fn resolve(
        &self,
        state_id: &str,
    ) -> Result<(Box<dyn ForecastModel>, HistoricalSeries), RegistryError>;
}

/// Registry backed by a features directory and a models directory.
///
/// Expects `<features_dir>/<State>_features.csv` and
/// `<models_dir>/<State>_model.toml`. States without a model file use the
/// fallback model if one is set.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    features_dir: PathBuf,
    models_dir: PathBuf,
    fallback: Option<ModelSpec>,
}

impl DirectoryRegistry {
    pub fn new(features_dir: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            features_dir: features_dir.into(),
            models_dir: models_dir.into(),
            fallback: None,
        }
    }

    /// Uses `spec` for states that have a table but no model file.
    pub fn with_fallback(mut self, spec: ModelSpec) -> Self {
        self.fallback = Some(spec);
        self
    }

    fn features_path(&self, state: &str) -> PathBuf {
        self.features_dir.join(format!("{state}{FEATURES_SUFFIX}"))
    }

    fn model_path(&self, state: &str) -> PathBuf {
        self.models_dir.join(format!("{state}{MODEL_SUFFIX}"))
    }

    fn load_model(&self, state: &str) -> Result<Box<dyn ForecastModel>, RegistryError> {
        let path = self.model_path(state);
        if path.is_file() {
            let spec = ModelSpec::from_toml_file(&path).map_err(|message| {
                RegistryError::ModelFile {
                    state: state.to_string(),
                    message,
                }
            })?;
            return Ok(spec.build());
        }

        match &self.fallback {
            Some(spec) => {
                info!(state, path = %path.display(), "model file missing, using fallback model");
                Ok(spec.build())
            }
            None => Err(RegistryError::ModelNotFound(state.to_string())),
        }
    }
}

impl StateModelRegistry for DirectoryRegistry {
    fn states(&self) -> Result<Vec<String>, RegistryError> {
        list_states(&self.features_dir)
    }

    fn resolve(
        &self,
        state_id: &str,
    ) -> Result<(Box<dyn ForecastModel>, HistoricalSeries), RegistryError> {
        let state = normalize_state_name(state_id);
        if !is_plain_state_name(state) {
            return Err(RegistryError::UnknownState(state.to_string()));
        }
        let table = self.features_path(state);
        if !table.is_file() {
            return Err(RegistryError::UnknownState(state.to_string()));
        }

        let series = read_series_path(&table).map_err(|source| RegistryError::Table {
            state: state.to_string(),
            source,
        })?;
        let model = self.load_model(state)?;
        debug!(
            state,
            records = series.len(),
            model = model.name(),
            "resolved state"
        );
        Ok((model, series))
    }
}

/// State names become file names, so they must not leave the data directory.
fn is_plain_state_name(state: &str) -> bool {
    !state.is_empty()
        && state != "."
        && !state.contains("..")
        && !state.contains(['/', '\\', '\0'])
}

fn list_states(dir: &Path) -> Result<Vec<String>, RegistryError> {
    let list_err = |source| RegistryError::List {
        path: dir.display().to_string(),
        source,
    };
    let mut states = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let name = entry.file_name();
        if let Some(state) = name.to_str().and_then(|n| n.strip_suffix(FEATURES_SUFFIX)) {
            states.push(state.to_string());
        }
    }
    states.sort();
    Ok(states)
}

/// Registry holding tables and model specs in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    entries: BTreeMap<String, (ModelSpec, HistoricalSeries)>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `state` under its normalized name, replacing any previous entry.
    pub fn insert(&mut self, state: &str, spec: ModelSpec, series: HistoricalSeries) {
        self.entries
            .insert(normalize_state_name(state).to_string(), (spec, series));
    }
}

impl StateModelRegistry for InMemoryRegistry {
    fn states(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn resolve(
        &self,
        state_id: &str,
    ) -> Result<(Box<dyn ForecastModel>, HistoricalSeries), RegistryError> {
        let state = normalize_state_name(state_id);
        self.entries
            .get(state)
            .map(|(spec, series)| (spec.build(), series.clone()))
            .ok_or_else(|| RegistryError::UnknownState(state.to_string()))
    }
}

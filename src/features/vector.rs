//! Named feature vectors and the schema they must keep across recursion.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ForecastError;

/// Load on the immediately preceding day.
pub const LAG_1: &str = "lag_1";
/// Load seven calendar days before the predicted day.
pub const LAG_7: &str = "lag_7";
/// Blended seven-day mean, see [`FeatureUpdater`](super::FeatureUpdater).
pub const ROLLING_MEAN_7: &str = "rolling_mean_7";
/// Day of month of the predicted day (1-31).
pub const DAY: &str = "day";
/// Month of the predicted day (1-12).
pub const MONTH: &str = "month";
/// Weekday of the predicted day, 0 = Monday.
pub const WEEKDAY: &str = "weekday";
/// Older single-state tables name the weekday column this way.
pub const DAY_OF_WEEK: &str = "day_of_week";

/// Fields the updater derives on every step, excluding the weekday column.
const DERIVED: &[&str] = &[LAG_1, LAG_7, ROLLING_MEAN_7, DAY, MONTH];

/// Ordered mapping from feature name to value.
///
/// Field order is insertion order and never changes once a field exists:
/// [`set`](Self::set) overwrites in place.
///
/// # Examples
///
/// ```
/// use load_forecast::features::FeatureVector;
///
/// let mut v = FeatureVector::from_pairs([("lag_1", 98.0), ("temp_c", 31.5)]);
/// v.set("lag_1", 99.0);
/// assert_eq!(v.get("lag_1"), Some(99.0));
/// assert_eq!(v.names().collect::<Vec<_>>(), vec!["lag_1", "temp_c"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    fields: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from `(name, value)` pairs, keeping their order.
    ///
    /// A repeated name overwrites the earlier value in its original position.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut v = Self::new();
        for (name, value) in pairs {
            v.set(name, value);
        }
        v
    }

    /// Returns the value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    /// Returns the value of `name` or an [`ForecastError::InvalidState`].
    pub fn require(&self, name: &str) -> Result<f64, ForecastError> {
        self.get(name)
            .ok_or_else(|| ForecastError::InvalidState(format!("missing required field `{name}`")))
    }

    /// Sets `name` to `value`, appending the field if it is new.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Whether the vector carries a field called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Field values in order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.fields.iter().map(|(_, v)| *v)
    }

    /// `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The exact field set a model was trained on, in table order.
///
/// Derived once from the historical table. Every vector produced during
/// recursion must match it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    weekday_field: &'static str,
}

impl FeatureSchema {
    /// Derives the schema from a template vector.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidState`] if a derived field is missing,
    /// or if neither or both of `weekday` / `day_of_week` are present.
    pub fn from_vector(vector: &FeatureVector) -> Result<Self, ForecastError> {
        for name in DERIVED {
            vector.require(name)?;
        }

        let weekday_field = match (vector.contains(WEEKDAY), vector.contains(DAY_OF_WEEK)) {
            (true, false) => WEEKDAY,
            (false, true) => DAY_OF_WEEK,
            (false, false) => {
                return Err(ForecastError::InvalidState(format!(
                    "missing required field `{WEEKDAY}` (or `{DAY_OF_WEEK}`)"
                )));
            }
            (true, true) => {
                return Err(ForecastError::InvalidState(format!(
                    "both `{WEEKDAY}` and `{DAY_OF_WEEK}` present; keep one"
                )));
            }
        };

        Ok(Self {
            names: vector.names().map(str::to_owned).collect(),
            weekday_field,
        })
    }

    /// Field names in table order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the weekday column used by this table.
    pub fn weekday_field(&self) -> &'static str {
        self.weekday_field
    }

    /// Whether `vector` carries exactly this field set in this order.
    pub fn matches(&self, vector: &FeatureVector) -> bool {
        vector.len() == self.names.len() && vector.names().eq(self.names.iter().map(String::as_str))
    }
}

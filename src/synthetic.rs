//! Seeded synthetic daily load and demo feature tables.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::ForecastError;
use crate::features::FeatureVector;
use crate::features::vector::{DAY, LAG_1, LAG_7, MONTH, ROLLING_MEAN_7, WEEKDAY};
use crate::model::{ForecastModel, ModelSpec};
use crate::registry::{RegistryError, StateModelRegistry, normalize_state_name};
use crate::series::{HistoricalSeries, SeriesRecord};

/// Seed offset between consecutive demo states to avoid correlated noise.
const STATE_SEED_OFFSET: u64 = 57;

/// Rows dropped at the start of a table because their lags are undefined.
const WARMUP_DAYS: usize = 7;

/// States served by [`SyntheticRegistry::demo`].
pub const DEMO_STATES: &[&str] = &["Bihar", "Gujarat", "Maharashtra", "Tamil Nadu", "Uttar Pradesh"];

/// Daily electricity demand generator.
///
/// Load is a baseline plus a weekly and an annual sinusoid plus Gaussian
/// noise, floored at zero.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use load_forecast::synthetic::SyntheticLoad;
///
/// let mut generator = SyntheticLoad::new(
///     300.0, // base_mw - average demand
///     20.0,  // weekly_amp_mw - weekday/weekend swing
///     40.0,  // annual_amp_mw - summer peak
///     5.0,   // noise_std_mw
///     42,    // seed
/// );
/// let daily = generator.daily_loads(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 14);
/// assert_eq!(daily.len(), 14);
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticLoad {
    /// Average demand in MW
    pub base_mw: f64,

    /// Amplitude of the weekly cycle in MW
    pub weekly_amp_mw: f64,

    /// Amplitude of the annual cycle in MW, peaking in early summer
    pub annual_amp_mw: f64,

    /// Standard deviation of the Gaussian noise in MW
    pub noise_std_mw: f64,

    rng: StdRng,
}

impl SyntheticLoad {
    pub fn new(
        base_mw: f64,
        weekly_amp_mw: f64,
        annual_amp_mw: f64,
        noise_std_mw: f64,
        seed: u64,
    ) -> Self {
        Self {
            base_mw,
            weekly_amp_mw,
            annual_amp_mw,
            noise_std_mw,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Demand on `date`, in MW.
    pub fn load_mw(&mut self, date: NaiveDate) -> f64 {
        use std::f64::consts::TAU;

        let week_pos = f64::from(date.weekday().num_days_from_monday()) / 7.0;
        // Day 135 (mid May) is the annual peak.
        let year_pos = (f64::from(date.ordinal()) - 135.0) / 365.25;
        let weekly = self.weekly_amp_mw * (TAU * week_pos).cos();
        let annual = self.annual_amp_mw * (TAU * year_pos).cos();
        let noise = gaussian_noise(&mut self.rng, self.noise_std_mw);

        (self.base_mw + weekly + annual + noise).max(0.0)
    }

    /// Generates `days` consecutive daily loads starting at `start`.
    pub fn daily_loads(&mut self, start: NaiveDate, days: usize) -> Vec<(NaiveDate, f64)> {
        start
            .iter_days()
            .take(days)
            .map(|date| (date, self.load_mw(date)))
            .collect()
    }

    /// Generates `days` of load and derives the feature table from it.
    ///
    /// # Errors
    ///
    /// See [`build_feature_table`].
    pub fn feature_table(
        &mut self,
        start: NaiveDate,
        days: usize,
    ) -> Result<HistoricalSeries, ForecastError> {
        build_feature_table(&self.daily_loads(start, days))
    }
}

/// Gaussian noise via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    z0 * std_dev
}

/// Builds a feature table from consecutive daily loads.
///
/// For row `i`: `lag_1` and `lag_7` are the loads 1 and 7 rows earlier,
/// `rolling_mean_7` is the mean of rows `i-6..=i`, and the calendar fields
/// describe row `i`'s date. The first seven rows are dropped since their
/// `lag_7` is undefined.
///
/// # Errors
///
/// Returns [`ForecastError::InsufficientHistory`] if fewer than eight loads
/// are given, or the [`HistoricalSeries`] validation error.
pub fn build_feature_table(daily: &[(NaiveDate, f64)]) -> Result<HistoricalSeries, ForecastError> {
    if daily.len() <= WARMUP_DAYS {
        return Err(ForecastError::InsufficientHistory {
            needed: WARMUP_DAYS + 1,
            got: daily.len(),
        });
    }

    let records = (WARMUP_DAYS..daily.len())
        .map(|i| {
            let (date, load) = daily[i];
            let window = &daily[i + 1 - WARMUP_DAYS..=i];
            let rolling = window.iter().map(|(_, l)| l).sum::<f64>() / WARMUP_DAYS as f64;
            SeriesRecord {
                date,
                load,
                features: FeatureVector::from_pairs([
                    (LAG_1, daily[i - 1].1),
                    (LAG_7, daily[i - 7].1),
                    (ROLLING_MEAN_7, rolling),
                    (DAY, f64::from(date.day())),
                    (MONTH, f64::from(date.month())),
                    (WEEKDAY, f64::from(date.weekday().num_days_from_monday())),
                ]),
            }
        })
        .collect();
    HistoricalSeries::new(records)
}

/// Linear model used for synthetic states: a convex blend of the lag and
/// rolling-mean features with zero calendar weights.
pub fn demo_model_spec() -> ModelSpec {
    ModelSpec::Linear {
        intercept: 0.0,
        coefficients: BTreeMap::from([
            (LAG_1.to_string(), 0.5),
            (LAG_7.to_string(), 0.3),
            (ROLLING_MEAN_7.to_string(), 0.2),
            (DAY.to_string(), 0.0),
            (MONTH.to_string(), 0.0),
            (WEEKDAY.to_string(), 0.0),
        ]),
    }
}

/// Registry serving seeded synthetic tables, for demos and tests.
///
/// Each state gets its own demand level and noise stream. Resolving the same
/// state twice yields identical tables.
#[derive(Debug, Clone)]
pub struct SyntheticRegistry {
    states: Vec<String>,
    start: NaiveDate,
    days: usize,
    seed: u64,
}

impl SyntheticRegistry {
    pub fn new(states: Vec<String>, start: NaiveDate, days: usize, seed: u64) -> Self {
        Self {
            states,
            start,
            days,
            seed,
        }
    }

    /// One year of data for [`DEMO_STATES`], starting 2023-01-01.
    pub fn demo(seed: u64) -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN);
        Self::new(
            DEMO_STATES.iter().map(|s| (*s).to_string()).collect(),
            start,
            365,
            seed,
        )
    }

    /// Last date of every synthetic table.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.start
            .checked_add_days(Days::new(self.days.checked_sub(1)? as u64))
    }
}

impl StateModelRegistry for SyntheticRegistry {
    fn states(&self) -> Result<Vec<String>, RegistryError> {
        let mut states = self.states.clone();
        states.sort();
        Ok(states)
    }

    fn resolve(
        &self,
        state_id: &str,
    ) -> Result<(Box<dyn ForecastModel>, HistoricalSeries), RegistryError> {
        let state = normalize_state_name(state_id);
        let idx = self
            .states
            .iter()
            .position(|s| s == state)
            .ok_or_else(|| RegistryError::UnknownState(state.to_string()))?;

        let scale = 1.0 + idx as f64 * 0.75;
        let seed = self
            .seed
            .wrapping_add(STATE_SEED_OFFSET.wrapping_mul(idx as u64));
        let series = SyntheticLoad::new(200.0 * scale, 15.0 * scale, 35.0 * scale, 4.0 * scale, seed)
            .feature_table(self.start, self.days)
            .map_err(|e| RegistryError::ModelFile {
                state: state.to_string(),
                message: e.to_string(),
            })?;
        Ok((demo_model_spec().build(), series))
    }
}
